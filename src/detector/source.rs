use std::{fmt, time::Duration};

use async_trait::async_trait;

use super::{DeviceError, DeviceProperties};

/// Kind of device change reported by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// A new block device appeared
    Added,
    /// A block device disappeared
    Removed,
    /// Properties of an existing block device changed
    Changed,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Added => write!(f, "added"),
            SignalKind::Removed => write!(f, "removed"),
            SignalKind::Changed => write!(f, "changed"),
        }
    }
}

/// One device notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSignal {
    /// Bus path of the device
    pub path: String,
    /// What happened
    pub kind: SignalKind,
}

impl DeviceSignal {
    /// Creates a signal for `path`.
    pub fn new(path: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Disk-management bus as seen by the detector.
///
/// Every method is fallible and every failure is recoverable: the detector
/// logs it and moves on.
#[async_trait]
pub trait DeviceEventSource: Send + Sync {
    /// Waits at most `timeout` for the next device signal.
    ///
    /// # Errors
    /// Returns `DeviceError::Closed` if the source shut down, or a
    /// transport error if the bus connection broke.
    async fn wait_for_signal(&self, timeout: Duration) -> Result<Option<DeviceSignal>, DeviceError>;

    /// Reads the current properties of a device.
    ///
    /// # Errors
    /// Returns a transport error if a required property cannot be read.
    async fn describe(&self, device: &str) -> Result<DeviceProperties, DeviceError>;

    /// Whether the device currently has a mounted filesystem.
    ///
    /// # Errors
    /// `DeviceError::NotSupported` if the device carries no filesystem.
    async fn is_mounted(&self, device: &str) -> Result<bool, DeviceError>;

    /// Mounts the device and returns the mount path reported by the bus.
    ///
    /// # Errors
    /// `DeviceError::NotSupported` if the device carries no filesystem,
    /// a transport error otherwise.
    async fn mount(&self, device: &str) -> Result<String, DeviceError>;

    /// Unmounts the device.
    ///
    /// # Errors
    /// Returns an error if the bus refuses the unmount.
    async fn unmount(&self, device: &str) -> Result<(), DeviceError>;

    /// Current mount paths of the device.
    ///
    /// # Errors
    /// `DeviceError::NotSupported` if the device carries no filesystem.
    async fn mount_paths(&self, device: &str) -> Result<Vec<String>, DeviceError>;

    /// All block devices currently known to the bus.
    ///
    /// # Errors
    /// Returns a transport error if the enumeration call fails.
    async fn enumerate_devices(&self) -> Result<Vec<String>, DeviceError>;

    /// Resolves a device file such as `/dev/sr0` to its bus path.
    ///
    /// # Errors
    /// `DeviceError::NotFound` if no device uses that file.
    async fn find_device_by_file(&self, device_file: &str) -> Result<String, DeviceError>;
}
