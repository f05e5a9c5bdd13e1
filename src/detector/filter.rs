use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use super::{ConfigError, DeviceProperties, Section};

/// Keyword in `FILTERDEV` that pulls boot-mounted devices from the mount table.
pub const AUTO_FILTER_KEYWORD: &str = "AUTO";

/// Default host mount table.
pub const FSTAB_PATH: &str = "/etc/fstab";

const FILTER_KEY: &str = "FILTERDEV";
const SCAN_KEY: &str = "SCANDEV";

/// Devices excluded from detection.
///
/// `substrings` are matched anywhere in the native path or device file;
/// `exact` entries must equal the native path, device file or bus path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    substrings: BTreeSet<String>,
    exact: BTreeSet<String>,
}

impl DeviceFilter {
    /// Adds a substring exclude.
    pub fn add_substring(&mut self, pattern: impl Into<String>) {
        self.substrings.insert(pattern.into());
    }

    /// Adds an exact-match exclude.
    pub fn add_exact(&mut self, device: impl Into<String>) {
        self.exact.insert(device.into());
    }

    /// Adds every device the mount table mounts at boot as exact excludes.
    pub fn add_mount_table(&mut self, fstab: &Path) {
        let devices = boot_mounted_devices(fstab);
        info!(fstab = %fstab.display(), count = devices.len(), "Auto filter loaded");
        self.exact.extend(devices);
    }

    /// Substring excludes.
    pub fn substrings(&self) -> impl Iterator<Item = &str> {
        self.substrings.iter().map(String::as_str)
    }

    /// Exact-match excludes.
    pub fn exact(&self) -> impl Iterator<Item = &str> {
        self.exact.iter().map(String::as_str)
    }

    /// Whether a device described by `props` and reachable at bus `path`
    /// must be skipped.
    pub fn excludes(&self, path: &str, props: &DeviceProperties) -> bool {
        let candidates = [props.native_path.as_str(), props.device_file.as_str()];

        let by_substring = self.substrings.iter().any(|pattern| {
            candidates
                .iter()
                .any(|c| !c.is_empty() && c.contains(pattern.as_str()))
        });
        if by_substring {
            return true;
        }

        candidates
            .iter()
            .chain(std::iter::once(&path))
            .any(|c| !c.is_empty() && self.exact.contains(*c))
    }
}

/// Detector-wide options from the `GLOBAL` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Devices never classified
    pub filter: DeviceFilter,
    /// Device files always included in a manual scan
    pub scan_devices: Vec<String>,
}

impl GlobalOptions {
    /// Reads `FILTERDEV` and `SCANDEV` from the `GLOBAL` section.
    ///
    /// `fstab` is consulted only when `FILTERDEV` contains `AUTO`.
    ///
    /// # Errors
    /// `ConfigError::UnknownKey` for any other key.
    pub fn from_section(section: &Section, fstab: &Path) -> Result<Self, ConfigError> {
        section.check_keys(&[], &[FILTER_KEY, SCAN_KEY])?;

        let mut options = Self::default();
        for value in section.values(FILTER_KEY).unwrap_or_default() {
            if value.eq_ignore_ascii_case(AUTO_FILTER_KEYWORD) {
                options.filter.add_mount_table(fstab);
            } else {
                info!(device = %value, "Filter device");
                options.filter.add_substring(value.as_str());
            }
        }

        for value in section.values(SCAN_KEY).unwrap_or_default() {
            let device_file = if value.starts_with('/') {
                value.clone()
            } else {
                format!("/dev/{value}")
            };
            info!(device = %device_file, "Scan device");
            options.scan_devices.push(device_file);
        }

        Ok(options)
    }
}

/// Devices the mount table mounts automatically at boot.
///
/// Entries marked `noauto` are ignored, as are pseudo filesystems.
/// `UUID=`/`LABEL=`/`PARTUUID=`/`PARTLABEL=` specs are mapped to their
/// `/dev/disk/by-*` alias and, where the alias resolves, to the real node.
pub fn boot_mounted_devices(fstab: &Path) -> BTreeSet<String> {
    let content = match fs::read_to_string(fstab) {
        Ok(content) => content,
        Err(err) => {
            warn!(fstab = %fstab.display(), error = %err, "Cannot read mount table");
            return BTreeSet::new();
        }
    };

    let mut devices = BTreeSet::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let (Some(spec), Some(options)) = (fields.first(), fields.get(3)) else {
            continue;
        };
        if options.split(',').any(|opt| opt == "noauto") {
            continue;
        }

        let Some(device) = device_node(spec) else {
            continue;
        };
        debug!(device = %device.display(), "Boot mounted device");

        if let Ok(real) = fs::canonicalize(&device) {
            devices.insert(real.to_string_lossy().into_owned());
        }
        devices.insert(device.to_string_lossy().into_owned());
    }
    devices
}

fn device_node(spec: &str) -> Option<PathBuf> {
    if spec.starts_with("/dev/") {
        return Some(PathBuf::from(spec));
    }

    let (tag, value) = spec.split_once('=')?;
    let dir = match tag {
        "UUID" => "by-uuid",
        "LABEL" => "by-label",
        "PARTUUID" => "by-partuuid",
        "PARTLABEL" => "by-partlabel",
        _ => return None,
    };
    let value = value.trim_matches('"');
    Some(Path::new("/dev/disk").join(dir).join(value))
}
