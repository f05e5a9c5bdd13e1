use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

/// Whether device events trigger classification on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkingMode {
    /// Classify on every device event
    #[default]
    Auto,
    /// Only record devices, classify on manual scan requests
    #[serde(rename = "manual")]
    ManualStart,
}

#[derive(Debug, Default)]
struct ControlFlags {
    stopped: AtomicBool,
    manual_scan: AtomicBool,
    manual_mode: AtomicBool,
}

/// Cloneable remote control for a running detector.
///
/// The flags are independent booleans; no ordering is needed between them.
#[derive(Debug, Clone, Default)]
pub struct DetectorControl {
    flags: Arc<ControlFlags>,
}

impl DetectorControl {
    /// Control in the given working mode.
    pub fn new(mode: WorkingMode) -> Self {
        let control = Self::default();
        control.set_working_mode(mode);
        control
    }

    /// Requests the detect loop to exit. Irreversible.
    pub fn stop(&self) {
        self.flags.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether the detect loop may keep going.
    pub fn is_running(&self) -> bool {
        !self.flags.stopped.load(Ordering::SeqCst)
    }

    /// Treats the next idle poll timeout as a manual scan trigger.
    pub fn start_manual_scan(&self) {
        self.flags.manual_scan.store(true, Ordering::SeqCst);
    }

    /// Whether a manual scan is pending.
    pub fn manual_scan_requested(&self) -> bool {
        self.flags.manual_scan.load(Ordering::SeqCst)
    }

    pub(crate) fn take_manual_scan(&self) -> bool {
        self.flags.manual_scan.swap(false, Ordering::SeqCst)
    }

    /// Switches between automatic and manual-start detection.
    pub fn set_working_mode(&self, mode: WorkingMode) {
        self.flags
            .manual_mode
            .store(mode == WorkingMode::ManualStart, Ordering::SeqCst);
    }

    /// Current working mode.
    pub fn working_mode(&self) -> WorkingMode {
        if self.flags.manual_mode.load(Ordering::SeqCst) {
            WorkingMode::ManualStart
        } else {
            WorkingMode::Auto
        }
    }
}
