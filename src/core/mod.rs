use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detector::ConfigError;
use crate::rules::RulesError;
use crate::services::UDisksError;

/// Error types for the media detector daemon.
///
/// Only load-time failures surface here. Everything that goes wrong while
/// watching devices is logged and swallowed inside the detector loop.
#[derive(Error, Debug)]
pub enum MediaDetectError {
    /// Settings file could not be parsed or validated
    #[error("failed to parse settings at '{location}': {details}")]
    SettingsParse {
        /// Location of the settings being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// Rules file is syntactically broken
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// Rules file parsed but a tester section is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O operation error with path context
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// Standard I/O operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not reach the system bus or the disk service on it
    #[error("D-Bus operation failed: {0}")]
    Dbus(#[from] zbus::Error),

    /// Disk service refused a request made outside the detector loop
    #[error(transparent)]
    Disks(#[from] UDisksError),
}

/// A specialized `Result` type for media detector operations.
pub type Result<T> = std::result::Result<T, MediaDetectError>;

impl MediaDetectError {
    /// Creates a settings parse error with optional file path context.
    pub fn settings_parse(error: impl std::fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        MediaDetectError::SettingsParse {
            location,
            details: error.to_string(),
        }
    }

    /// Creates an I/O error carrying the path it happened on.
    pub fn io_at(error: impl std::fmt::Display, path: &Path) -> Self {
        MediaDetectError::IoError {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }
}
