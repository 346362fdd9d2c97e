//! Configuration schema for the registry and its logging.
//!
//! All sections are optional in TOML; missing fields fall back to defaults.

mod general;
mod loading;
mod registry;

#[cfg(test)]
mod tests;

pub use general::{GeneralConfig, LogFormat, LogLevel};
pub use registry::RegistryConfig;

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Logging settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,
}
