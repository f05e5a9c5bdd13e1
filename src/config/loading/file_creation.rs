use std::{fs, path::Path};

use tracing::info;

use crate::config::Config;
use crate::{MediaDetectError, Result};

const HEADER: &str = "# mediadetect settings\n#\n# Media rules live in the rules file named by detector.rules_file.\n\n";

/// Writes a settings file holding the defaults.
pub(super) fn create_default_config_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MediaDetectError::io_at(e, parent))?;
    }

    let body = toml::to_string_pretty(&Config::default())
        .map_err(|e| MediaDetectError::settings_parse(e, Some(path)))?;

    fs::write(path, format!("{HEADER}{body}")).map_err(|e| MediaDetectError::io_at(e, path))?;
    info!(path = %path.display(), "Created default settings file");

    Ok(())
}
