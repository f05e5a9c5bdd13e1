//! Removable media detection.
//!
//! A [`MediaDetector`] waits on a [`DeviceEventSource`] for device signals,
//! describes the device as a [`MediaHandle`] and runs it through the
//! configured [`MediaTester`] chain. The first tester that recognises the
//! medium wins and its key list is handed back as a [`Detection`].

mod control;
mod error;
mod filter;
mod handle;
mod keys;
mod mount;
mod registry;
mod service;
mod source;
pub mod testers;


pub use control::{DetectorControl, WorkingMode};
pub use error::{DeviceError, TesterError};
pub use filter::{AUTO_FILTER_KEYWORD, DeviceFilter, FSTAB_PATH, GlobalOptions, boot_mounted_devices};
pub use handle::{DeviceProperties, MediaHandle, MediaMask};
pub use keys::{ActionKey, InvalidActionKey, KeyList};
pub use mount::{MountRetry, auto_mount};
pub use registry::TesterRegistry;
pub use service::{Detection, DetectorSettings, MediaDetector};
pub use source::{DeviceEventSource, DeviceSignal, SignalKind};
pub use testers::{MediaMatch, MediaTester, MountPolicy};

pub use crate::rules::{ConfigError, GLOBAL_SECTION, Rules, Section};
