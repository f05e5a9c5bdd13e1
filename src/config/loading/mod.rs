mod file_creation;

use std::{fs, path::Path};

use file_creation::create_default_config_file;
use tracing::debug;

use super::Config;
use crate::{MediaDetectError, Result};

impl Config {
    /// Loads the settings file, writing one with defaults first if it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be created or read
    /// - The TOML content is invalid
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            create_default_config_file(path)?;
        }

        let content = fs::read_to_string(path).map_err(|e| MediaDetectError::io_at(e, path))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| MediaDetectError::settings_parse(e, Some(path)))?;

        debug!(path = %path.display(), "Settings loaded");
        Ok(config)
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    /// Returns `MediaDetectError::SettingsParse` if the text is not valid
    /// settings TOML.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| MediaDetectError::settings_parse(e, None))
    }
}
