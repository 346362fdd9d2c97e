use std::{fs, path::Path};

use super::Config;
use crate::{ObserveError, Result};

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file cannot be read
    /// - The TOML content is invalid
    /// - The resulting configuration fails validation
    pub fn load(path: &Path) -> Result<Config> {
        let file_content = fs::read_to_string(path).map_err(|e| ObserveError::io(&e, path))?;

        let config: Config =
            toml::from_str(&file_content).map_err(|e| ObserveError::toml_parse(e, Some(path)))?;

        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config =
            toml::from_str(content).map_err(|e| ObserveError::toml_parse(e, None))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    /// * `ObserveError::Config` - If `registry.failure_channel_capacity` is zero
    pub fn validate(&self) -> Result<()> {
        if self.registry.failure_channel_capacity == 0 {
            return Err(ObserveError::Config {
                component: "registry".to_string(),
                details: "failure_channel_capacity must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
