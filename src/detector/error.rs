use std::{io, path::PathBuf};

/// Failures reported by a device event source.
///
/// None of these are fatal. The detector logs them and treats the affected
/// device as "no new information" for the current cycle.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Optional interface or property is absent, e.g. no filesystem on an
    /// audio CD. Callers substitute a default.
    #[error("device {device} does not support {interface}")]
    NotSupported {
        /// Bus path of the device
        device: String,
        /// Missing interface or property
        interface: String,
    },

    /// Bus call failed
    #[error("{operation} failed: {reason}")]
    Transport {
        /// The operation that failed
        operation: &'static str,
        /// The reason the operation failed
        reason: String,
    },

    /// Signal arrived without the expected arguments
    #[error("malformed signal: {0}")]
    MalformedSignal(String),

    /// No device matches the given device file
    #[error("device {0} not found")]
    NotFound(String),

    /// Mounting gave up after the configured number of attempts
    #[error("mounting {device} failed after {attempts} attempts")]
    MountFailed {
        /// Bus path of the device
        device: String,
        /// Attempts made
        attempts: u32,
    },

    /// Event source has shut down
    #[error("device event source is closed")]
    Closed,
}

impl DeviceError {
    /// Whether this only signals an absent optional capability.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, DeviceError::NotSupported { .. })
    }
}

/// Failure inside a single tester hook.
///
/// Caught per tester by the detector so one tester never blocks another.
#[derive(thiserror::Error, Debug)]
pub enum TesterError {
    /// Event source call made by the tester failed
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Filesystem operation failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl TesterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TesterError::Io {
            path: path.into(),
            source,
        }
    }
}
