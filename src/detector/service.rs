use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::{
    ConfigError, DetectorControl, DeviceError, DeviceEventSource, DeviceFilter, DeviceSignal,
    GlobalOptions, KeyList, MediaHandle, MediaMask, MountPolicy, MountRetry, Rules, SignalKind,
    TesterRegistry, WorkingMode, filter::FSTAB_PATH,
};
use crate::core::Result;

/// A classified medium, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Description of the matching tester
    pub description: String,
    /// Actions to dispatch, in order
    pub keys: KeyList,
    /// The device as seen during the detect cycle
    pub handle: MediaHandle,
}

/// Detector tuning taken from the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorSettings {
    /// Upper bound on one wait for a device signal
    pub poll_interval: Duration,
    /// Auto-mount retry policy handed to the file tester
    pub mount_retry: MountRetry,
    /// Initial working mode
    pub working_mode: WorkingMode,
    /// Mount table read for `FILTERDEV = AUTO`
    pub fstab: PathBuf,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            mount_retry: MountRetry::default(),
            working_mode: WorkingMode::Auto,
            fstab: PathBuf::from(FSTAB_PATH),
        }
    }
}

/// Device event loop driving the tester chain.
///
/// `detect` is one-shot: it returns on the first positive classification
/// and must be called again to keep watching.
pub struct MediaDetector {
    source: Arc<dyn DeviceEventSource>,
    registry: TesterRegistry,
    filter: DeviceFilter,
    known_devices: BTreeSet<String>,
    scan_devices: BTreeSet<String>,
    device_files: HashMap<String, String>,
    control: DetectorControl,
    poll_interval: Duration,
}

impl MediaDetector {
    /// Loads the rules file and builds a detector with the built-in testers.
    ///
    /// # Errors
    /// Returns `MediaDetectError::Rules` or `MediaDetectError::Config` if
    /// the rules file is unreadable or invalid. No partial configuration
    /// is ever used.
    #[instrument(skip(source, settings))]
    pub async fn initialize(
        source: Arc<dyn DeviceEventSource>,
        rules_file: &Path,
        settings: DetectorSettings,
    ) -> Result<Self> {
        let rules = Rules::load(rules_file)?;
        let registry = TesterRegistry::with_builtin(settings.mount_retry);
        Ok(Self::from_rules(source, registry, &rules, settings).await?)
    }

    /// Binds `rules` to the prototypes of `registry` and seeds the scan set.
    ///
    /// # Errors
    /// Returns the first `ConfigError` of any section.
    pub async fn from_rules(
        source: Arc<dyn DeviceEventSource>,
        mut registry: TesterRegistry,
        rules: &Rules,
        settings: DetectorSettings,
    ) -> std::result::Result<Self, ConfigError> {
        let global = match rules.section(super::GLOBAL_SECTION) {
            Some(section) => GlobalOptions::from_section(section, &settings.fstab)?,
            None => GlobalOptions::default(),
        };
        registry.register_rules(rules)?;

        Ok(Self::with_registry(source, registry, global, settings).await)
    }

    /// Detector over an already populated registry.
    pub async fn with_registry(
        source: Arc<dyn DeviceEventSource>,
        registry: TesterRegistry,
        global: GlobalOptions,
        settings: DetectorSettings,
    ) -> Self {
        let mut detector = Self {
            source,
            registry,
            filter: global.filter,
            known_devices: BTreeSet::new(),
            scan_devices: BTreeSet::new(),
            device_files: HashMap::new(),
            control: DetectorControl::new(settings.working_mode),
            poll_interval: settings.poll_interval,
        };
        detector.seed_scan_devices(&global.scan_devices).await;
        detector
    }

    async fn seed_scan_devices(&mut self, extra: &[String]) {
        match self.source.enumerate_devices().await {
            Ok(paths) => {
                for path in paths {
                    let props = match self.source.describe(&path).await {
                        Ok(props) => props,
                        Err(err) => {
                            warn!(device = %path, error = %err, "Cannot describe device");
                            continue;
                        }
                    };
                    if props.partition || self.filter.excludes(&path, &props) {
                        continue;
                    }
                    debug!(device = %props.device_file, "Scan device");
                    self.device_files.insert(path, props.device_file.clone());
                    self.scan_devices.insert(props.device_file);
                }
            }
            Err(err) => warn!(error = %err, "Cannot enumerate devices"),
        }

        for device_file in extra {
            match self.source.find_device_by_file(device_file).await {
                Ok(path) => debug!(device = %device_file, path, "Configured scan device resolved"),
                Err(err) => warn!(device = %device_file, error = %err, "Configured scan device not present"),
            }
            self.scan_devices.insert(device_file.clone());
        }
        info!(count = self.scan_devices.len(), "Scan devices seeded");
    }

    /// Handle to stop the loop or request a manual scan from elsewhere.
    pub fn control(&self) -> DetectorControl {
        self.control.clone()
    }

    /// Requests the loop to exit.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Treats the next idle timeout as a manual scan request.
    pub fn start_manual_scan(&self) {
        self.control.start_manual_scan();
    }

    /// Switches between automatic and manual-start detection.
    pub fn set_working_mode(&self, mode: WorkingMode) {
        self.control.set_working_mode(mode);
    }

    /// Device files seen through real events.
    pub fn known_devices(&self) -> &BTreeSet<String> {
        &self.known_devices
    }

    /// Device files always included in a manual scan.
    pub fn scan_devices(&self) -> &BTreeSet<String> {
        &self.scan_devices
    }

    /// Exclude filter in effect.
    pub fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    /// Testers in use.
    pub fn registry(&self) -> &TesterRegistry {
        &self.registry
    }

    /// Waits for the next classified medium.
    ///
    /// Returns `None` once the loop has been stopped or the event source
    /// closed. Every other failure is logged and the loop continues.
    pub async fn detect(&mut self) -> Option<Detection> {
        while self.control.is_running() {
            match self.source.wait_for_signal(self.poll_interval).await {
                Ok(Some(signal)) => {
                    if let Some(detection) = self.handle_signal(signal).await {
                        return Some(detection);
                    }
                }
                Ok(None) => {
                    if self.control.take_manual_scan()
                        && let Some(detection) = self.manual_scan().await
                    {
                        return Some(detection);
                    }
                }
                Err(DeviceError::Closed) => {
                    error!("Device event source closed, stopping detector");
                    self.control.stop();
                }
                Err(err) => {
                    warn!(error = %err, "Waiting for device signal failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        None
    }

    /// Scans the known and configured devices once, without waiting for
    /// a signal or a scan request.
    pub async fn scan_now(&mut self) -> Option<Detection> {
        self.manual_scan().await
    }

    async fn handle_signal(&mut self, signal: DeviceSignal) -> Option<Detection> {
        debug!(device = %signal.path, kind = %signal.kind, "Device signal");

        if signal.kind == SignalKind::Removed {
            let device_file = self.device_files.remove(&signal.path).unwrap_or_default();
            self.remove_device(&MediaHandle::removed(signal.path, device_file))
                .await;
            return None;
        }

        let props = match self.source.describe(&signal.path).await {
            Ok(props) => props,
            Err(err) => {
                warn!(device = %signal.path, error = %err, "Cannot describe device");
                return None;
            }
        };
        if self.filter.excludes(&signal.path, &props) {
            info!(device = %props.device_file, "Device in device filter");
            return None;
        }

        self.device_files
            .insert(signal.path.clone(), props.device_file.clone());
        let handle = MediaHandle::from_properties(signal.path, props);
        if !handle.has(MediaMask::AVAILABLE) {
            self.remove_device(&handle).await;
            return None;
        }

        self.do_detect(handle, false).await
    }

    async fn remove_device(&mut self, handle: &MediaHandle) {
        info!(device = handle.path(), device_file = handle.device_file(), "Device removed");

        for tester in self.registry.prototypes_mut() {
            if let Err(err) = tester.remove_device(handle).await {
                warn!(tester = tester.description(), error = %err, "Device removal hook failed");
            }
        }
        self.known_devices.remove(handle.device_file());
    }

    async fn manual_scan(&mut self) -> Option<Detection> {
        let devices: Vec<String> = self
            .known_devices
            .iter()
            .chain(
                self.scan_devices
                    .iter()
                    .filter(|d| !self.known_devices.contains(*d)),
            )
            .cloned()
            .collect();

        for device_file in devices {
            info!(device = %device_file, "Manual scan");

            let path = match self.source.find_device_by_file(&device_file).await {
                Ok(path) => path,
                Err(err) => {
                    warn!(device = %device_file, error = %err, "Cannot resolve device");
                    continue;
                }
            };
            let props = match self.source.describe(&path).await {
                Ok(props) => props,
                Err(err) => {
                    warn!(device = %device_file, error = %err, "Cannot describe device");
                    continue;
                }
            };

            let handle = MediaHandle::from_properties(path, props);
            if let Some(detection) = self.do_detect(handle, true).await {
                return Some(detection);
            }
        }

        debug!("Manual scan found nothing");
        None
    }

    async fn do_detect(&mut self, mut handle: MediaHandle, manual: bool) -> Option<Detection> {
        if !manual {
            if !self.scan_devices.contains(handle.device_file()) {
                self.known_devices.insert(handle.device_file().to_string());
            }
            if self.control.working_mode() == WorkingMode::ManualStart {
                debug!(device = handle.device_file(), "Manual start mode, not scanning");
                return None;
            }
        }

        let source = self.source.as_ref();

        for tester in self.registry.prototypes_mut() {
            if let Err(err) = tester.start_scan(&mut handle, source).await {
                warn!(tester = tester.description(), error = %err, "Start of scan failed");
            }
        }

        let mut found = None;
        for tester in self.registry.registered() {
            match tester.is_media(&handle) {
                Ok(Some(matched)) => {
                    info!(tester = tester.description(), device = handle.device_file(), "Found");
                    found = Some((tester.description().to_string(), matched));
                    break;
                }
                Ok(None) => {}
                Err(err) => warn!(tester = tester.description(), error = %err, "Media test failed"),
            }
        }

        let policy = found
            .as_ref()
            .map(|(_, matched)| matched.policy.clone())
            .unwrap_or_else(MountPolicy::default);
        for tester in self.registry.prototypes_mut() {
            if let Err(err) = tester.end_scan(&mut handle, source, &policy).await {
                warn!(tester = tester.description(), error = %err, "End of scan failed");
            }
        }

        found.map(|(description, matched)| Detection {
            description,
            keys: matched.keys,
            handle,
        })
    }
}

impl std::fmt::Debug for MediaDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDetector")
            .field("registry", &self.registry)
            .field("filter", &self.filter)
            .field("known_devices", &self.known_devices)
            .field("scan_devices", &self.scan_devices)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}
