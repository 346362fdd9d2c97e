mod log_level;

pub use log_level::{LogFormat, LogLevel};
use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GeneralConfig {
    /// Logging level used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Console log format.
    #[serde(default)]
    pub log_format: LogFormat,
}
