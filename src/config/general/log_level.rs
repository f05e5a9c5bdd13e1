use serde::{Deserialize, Serialize};
use std::fmt;

/// Verbosity of the daemon's log output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only failures that stop the daemon.
    Error,

    /// Recoverable problems such as failed mounts or unreadable devices.
    Warn,

    /// Detections, configuration summary and lifecycle (default level).
    #[default]
    Info,

    /// Every device signal and tester decision.
    Debug,

    /// Bus-level detail.
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}
