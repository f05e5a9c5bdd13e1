//! Daemon settings.
//!
//! The settings file is TOML and only tunes the daemon. Which media are
//! recognised and what happens then lives in the separate rules file read
//! by [`crate::rules`].

mod general;
mod loading;
mod paths;

#[cfg(test)]
mod tests;

use std::{path::PathBuf, time::Duration};

pub use general::{GeneralConfig, LogLevel};
pub use paths::ConfigPaths;

use serde::{Deserialize, Serialize};

use crate::detector::{DetectorSettings, FSTAB_PATH, MountRetry, WorkingMode};

/// Complete settings file.
///
/// Every field has a default so a partial or empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// General application settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Device watching and mounting.
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Delivery of detected actions.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// `[detector]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Rules file, `<config_dir>/mediadetect.conf` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,

    /// Longest wait for a device signal before checking for a manual scan.
    pub poll_interval_ms: u64,

    /// Whether detection starts automatically or only on request.
    pub working_mode: WorkingMode,

    /// Mount attempts before a device is given up on.
    pub mount_attempts: u32,

    /// Pause between two mount attempts.
    pub mount_backoff_ms: u64,

    /// Mount table consulted for `FILTERDEV = AUTO`.
    pub fstab: PathBuf,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            poll_interval_ms: 1000,
            working_mode: WorkingMode::Auto,
            mount_attempts: 3,
            mount_backoff_ms: 1000,
            fstab: PathBuf::from(FSTAB_PATH),
        }
    }
}

impl DetectorConfig {
    /// Rules file to load, falling back to the default location.
    ///
    /// # Errors
    /// Returns an error if no path is configured and the config
    /// directory cannot be determined.
    pub fn rules_path(&self) -> std::io::Result<PathBuf> {
        match &self.rules_file {
            Some(path) => Ok(path.clone()),
            None => ConfigPaths::rules_file(),
        }
    }

    /// Detector tuning derived from this section.
    pub fn settings(&self) -> DetectorSettings {
        DetectorSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            mount_retry: MountRetry {
                attempts: self.mount_attempts.max(1),
                backoff: Duration::from_millis(self.mount_backoff_ms),
            },
            working_mode: self.working_mode,
            fstab: self.fstab.clone(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pause between two dispatched actions.
    pub key_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { key_delay_ms: 500 }
    }
}

impl DispatchConfig {
    /// Pause between two dispatched actions.
    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }
}
