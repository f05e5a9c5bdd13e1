use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

const APP_NAME: &str = "mediadetect";

/// Locations of the daemon's files.
///
/// Follows the XDG Base Directory specification.
pub struct ConfigPaths;

impl ConfigPaths {
    /// Returns the configuration directory path for the application
    ///
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    /// - Appends "mediadetect" to the base config directory
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` environment variables are set
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_CONFIG_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(config_home).join(APP_NAME))
    }

    /// Returns the application data directory, creating it if needed.
    ///
    /// Uses `XDG_STATE_HOME`, falling back to `$HOME/.local/state`.
    ///
    /// # Errors
    /// Returns an error if no base directory is known or it cannot be created
    pub fn app_data_dir() -> Result<PathBuf, Error> {
        let state_home = env::var("XDG_STATE_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.local/state")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_STATE_HOME nor HOME environment variable found",
                )
            })?;

        let app_dir = PathBuf::from(state_home).join(APP_NAME);
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir)
    }

    /// Returns the log directory, creating it if needed.
    ///
    /// # Errors
    /// Returns error if directory cannot be created
    pub fn log_dir() -> Result<PathBuf, Error> {
        let log_dir = Self::app_data_dir()?.join("logs");
        std::fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }

    /// Returns the path to the settings file
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined
    pub fn main_config() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default path of the media rules file
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined
    pub fn rules_file() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join(format!("{APP_NAME}.conf")))
    }
}
