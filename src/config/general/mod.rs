mod log_level;

pub use log_level::LogLevel;
use serde::{Deserialize, Serialize};

/// Settings affecting the daemon as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GeneralConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_level: LogLevel,
}
