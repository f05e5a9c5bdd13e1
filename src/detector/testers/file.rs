use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{MediaMatch, MediaTester, MountPolicy, TesterBase};
use crate::detector::{
    ConfigError, DeviceEventSource, MediaHandle, MediaMask, MountRetry, Section, TesterError,
    mount::auto_mount,
};

const FILES_KEY: &str = "FILES";
const LINKPATH_KEY: &str = "LINKPATH";
const MOUNTPATH_KEY: &str = "MOUNTPATH";
const AUTOMOUNT_KEY: &str = "AUTOMOUNT";

/// Suffix of a file name: the text after the last `.`, empty if there is none.
pub fn file_suffix(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, suffix)| suffix)
}

/// Bookkeeping for a device the file tester has already handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDevice {
    /// Bus path of the device
    pub dev_path: String,
    /// Symlink created for it, if any
    pub link_path: Option<PathBuf>,
}

/// State shared by the file tester prototype and every instance it creates.
#[derive(Debug, Default)]
pub struct FileScanState {
    detected: BTreeSet<String>,
    devices: BTreeMap<String, TrackedDevice>,
    mount_error: bool,
}

impl FileScanState {
    /// Suffixes found on the device scanned in the current cycle.
    pub fn detected_suffixes(&self) -> &BTreeSet<String> {
        &self.detected
    }

    /// Tracked device keyed by its device file.
    pub fn tracked(&self, device_file: &str) -> Option<&TrackedDevice> {
        self.devices.get(device_file)
    }

    /// Number of tracked devices.
    pub fn tracked_count(&self) -> usize {
        self.devices.len()
    }

    fn forget(&mut self, dev_path: &str) -> Option<TrackedDevice> {
        let key = self
            .devices
            .iter()
            .find(|(_, device)| device.dev_path == dev_path)
            .map(|(key, _)| key.clone())?;
        self.devices.remove(&key)
    }
}

/// Matches mountable media by the suffixes of the files they contain.
#[derive(Debug, Clone)]
pub struct FileTester {
    base: TesterBase,
    suffixes: BTreeSet<String>,
    link_path: Option<PathBuf>,
    keep_mounted: bool,
    retry: MountRetry,
    state: Arc<Mutex<FileScanState>>,
}

impl FileTester {
    /// Type tag in rules sections.
    pub const TYPE: &'static str = "FILE";

    /// Prototype with its own scan state.
    pub fn new(retry: MountRetry) -> Self {
        Self {
            base: TesterBase::new(Self::TYPE, "Files"),
            suffixes: BTreeSet::new(),
            link_path: None,
            keep_mounted: true,
            retry,
            state: Arc::new(Mutex::new(FileScanState::default())),
        }
    }

    /// Handle to the scan state shared with created instances.
    pub fn shared_state(&self) -> Arc<Mutex<FileScanState>> {
        Arc::clone(&self.state)
    }

    /// Configured suffixes.
    pub fn suffixes(&self) -> &BTreeSet<String> {
        &self.suffixes
    }

    /// Mount policy applied when this instance matches.
    pub fn policy(&self) -> MountPolicy {
        MountPolicy {
            link_path: self.link_path.clone(),
            keep_mounted: self.keep_mounted,
        }
    }

    fn state(&self) -> MutexGuard<'_, FileScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget(&self, dev_path: &str) {
        let Some(device) = self.state().forget(dev_path) else {
            return;
        };
        info!(device = dev_path, "Removed from device set");

        if let Some(link) = device.link_path
            && let Err(err) = remove_link(&link)
        {
            warn!(link = %link.display(), error = %err, "Cannot remove link");
        }
    }

    fn load_link_path(section: &Section) -> Result<Option<PathBuf>, ConfigError> {
        let link = section.single_value(LINKPATH_KEY)?;
        let mount = section.single_value(MOUNTPATH_KEY)?;
        match (link, mount) {
            (Some(_), Some(_)) => Err(ConfigError::MultipleValues {
                section: section.name().to_string(),
                key: LINKPATH_KEY.to_string(),
            }),
            (Some(path), None) | (None, Some(path)) => Ok(Some(PathBuf::from(path))),
            (None, None) => Ok(None),
        }
    }

    fn load_automount(section: &Section) -> Result<bool, ConfigError> {
        let Some(value) = section.single_value(AUTOMOUNT_KEY)? else {
            return Ok(true);
        };
        match value.to_uppercase().as_str() {
            "YES" => Ok(true),
            "NO" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                section: section.name().to_string(),
                key: AUTOMOUNT_KEY.to_string(),
                value: value.to_string(),
                reason: "expected YES or NO".to_string(),
            }),
        }
    }
}

#[async_trait]
impl MediaTester for FileTester {
    fn type_tag(&self) -> &str {
        self.base.type_tag()
    }

    fn description(&self) -> &str {
        self.base.description()
    }

    fn create(&self) -> Box<dyn MediaTester> {
        Box::new(Self {
            base: TesterBase::new(self.base.type_tag(), self.base.description()),
            suffixes: BTreeSet::new(),
            link_path: None,
            keep_mounted: true,
            retry: self.retry,
            state: Arc::clone(&self.state),
        })
    }

    fn load_config(&mut self, section: &Section) -> Result<(), ConfigError> {
        self.base.load_config(
            section,
            &[FILES_KEY],
            &[LINKPATH_KEY, MOUNTPATH_KEY, AUTOMOUNT_KEY],
        )?;

        let mut suffixes = BTreeSet::new();
        for suffix in section.required_list(FILES_KEY)? {
            if suffix.is_empty() {
                return Err(ConfigError::InvalidValue {
                    section: section.name().to_string(),
                    key: FILES_KEY.to_string(),
                    value: suffix.clone(),
                    reason: "empty suffix".to_string(),
                });
            }
            info!(section = section.name(), suffix = %suffix, "Add file suffix");
            suffixes.insert(suffix.clone());
        }

        self.suffixes = suffixes;
        self.link_path = Self::load_link_path(section)?;
        self.keep_mounted = Self::load_automount(section)?;
        debug!(
            section = section.name(),
            link_path = ?self.link_path,
            keep_mounted = self.keep_mounted,
            "File tester configured"
        );
        Ok(())
    }

    fn is_media(&self, _handle: &MediaHandle) -> Result<Option<MediaMatch>, TesterError> {
        let found = self
            .state()
            .detected
            .iter()
            .any(|suffix| self.suffixes.contains(suffix));

        Ok(found.then(|| MediaMatch {
            keys: self.base.keys().to_vec(),
            policy: self.policy(),
        }))
    }

    async fn start_scan(
        &mut self,
        handle: &mut MediaHandle,
        source: &dyn DeviceEventSource,
    ) -> Result<(), TesterError> {
        {
            let mut state = self.state();
            state.detected.clear();
            state.mount_error = false;
        }

        if !handle.has(MediaMask::AVAILABLE) {
            self.forget(handle.path());
            return Ok(());
        }
        if self.state().devices.contains_key(handle.device_file()) {
            debug!(device = handle.device_file(), "Already in device set");
            return Ok(());
        }

        let mount_path = match auto_mount(source, handle.path(), &self.retry).await {
            Ok(mount_path) => mount_path,
            Err(err) if err.is_not_supported() => {
                debug!(device = handle.device_file(), "No filesystem to mount");
                self.state().mount_error = true;
                return Ok(());
            }
            Err(err) => {
                self.state().mount_error = true;
                return Err(err.into());
            }
        };
        handle.set_mount_path(Some(mount_path.clone()));

        info!(device = handle.device_file(), mount_path, "Building suffix cache");
        let root = PathBuf::from(&mount_path);
        let detected = match tokio::task::spawn_blocking(move || scan_suffixes(&root)).await {
            Ok(detected) => detected,
            Err(err) => {
                warn!(device = handle.device_file(), error = %err, "Suffix scan aborted");
                BTreeSet::new()
            }
        };
        debug!(device = handle.device_file(), suffixes = ?detected, "Suffix cache built");
        self.state().detected = detected;
        Ok(())
    }

    async fn end_scan(
        &mut self,
        handle: &mut MediaHandle,
        source: &dyn DeviceEventSource,
        policy: &MountPolicy,
    ) -> Result<(), TesterError> {
        {
            let state = self.state();
            if state.mount_error {
                debug!(device = handle.device_file(), "Skipping device with mount error");
                return Ok(());
            }
            if state.devices.contains_key(handle.device_file()) {
                return Ok(());
            }
        }
        if !handle.has(MediaMask::AVAILABLE) {
            return Ok(());
        }

        let mut linked = None;
        if let (Some(mount_path), Some(link_path)) = (handle.mount_path(), &policy.link_path) {
            info!(link = %link_path.display(), mount_path, "Linking mount path");
            match replace_link(Path::new(mount_path), link_path) {
                Ok(()) => linked = Some(link_path.clone()),
                Err(err) => warn!(link = %link_path.display(), error = %err, "Cannot create link"),
            }
        }

        if !policy.keep_mounted && handle.is_auto_mounted() {
            match source.unmount(handle.path()).await {
                Ok(()) => handle.set_mount_path(None),
                Err(err) => warn!(device = handle.device_file(), error = %err, "Unmount failed"),
            }
        }

        info!(device = handle.device_file(), "Added to device set");
        self.state().devices.insert(
            handle.device_file().to_string(),
            TrackedDevice {
                dev_path: handle.path().to_string(),
                link_path: linked,
            },
        );
        Ok(())
    }

    async fn remove_device(&mut self, handle: &MediaHandle) -> Result<(), TesterError> {
        self.forget(handle.path());
        Ok(())
    }
}

/// Suffixes of all regular files below `root`, skipping dot entries.
fn scan_suffixes(root: &Path) -> BTreeSet<String> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    let mut suffixes = BTreeSet::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let name = entry.file_name().to_string_lossy();
                suffixes.insert(file_suffix(&name).to_string());
            }
            Ok(_) => {}
            Err(err) => warn!(root = %root.display(), error = %err, "Cannot scan entry"),
        }
    }
    suffixes
}

/// Removes `link` if it is a symlink. A missing path is fine.
fn remove_link(link: &Path) -> io::Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(link),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a link", link.display()),
        )),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn replace_link(target: &Path, link: &Path) -> io::Result<()> {
    remove_link(link)?;
    std::os::unix::fs::symlink(target, link)
}
