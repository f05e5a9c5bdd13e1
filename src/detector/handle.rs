use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Classification-relevant state of a device.
    ///
    /// Flags are not exclusive: a mounted data disc is `OPTICAL | MOUNTED |
    /// AVAILABLE | FS_ISO9660`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct MediaMask: u32 {
        /// Device is an optical drive.
        const OPTICAL = 0x001;
        /// At least one filesystem of the device is mounted.
        const MOUNTED = 0x002;
        /// Device is a partition of another block device.
        const PARTITION = 0x004;
        /// Filesystem type is iso9660.
        const FS_ISO9660 = 0x020;
        /// Filesystem type is udf.
        const FS_UDF = 0x040;
        /// No filesystem type could be determined.
        const FS_UNKNOWN = 0x080;
        /// A medium is present in the drive.
        const AVAILABLE = 0x100;
        /// Filesystem type is vfat.
        const FS_VFAT = 0x200;
    }
}

/// Raw device properties as reported by a [`DeviceEventSource`](super::DeviceEventSource).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProperties {
    /// OS device node, e.g. `/dev/sr0`
    pub native_path: String,
    /// Preferred device file used to open the raw device
    pub device_file: String,
    /// Filesystem type, empty if unknown
    pub fs_type: String,
    /// Device is an optical drive
    pub optical: bool,
    /// Device has a mounted filesystem
    pub mounted: bool,
    /// Device is a partition
    pub partition: bool,
    /// A medium is present
    pub available: bool,
}

/// Snapshot of one device at the moment of an event.
///
/// Built fresh for every detect cycle and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaHandle {
    path: String,
    native_path: String,
    device_file: String,
    fs_type: String,
    media_mask: MediaMask,
    mount_path: Option<String>,
}

impl MediaHandle {
    /// Builds a handle for the bus object `path` and derives its mask.
    pub fn from_properties(path: impl Into<String>, props: DeviceProperties) -> Self {
        let media_mask = Self::compute_mask(&props);
        Self {
            path: path.into(),
            native_path: props.native_path,
            device_file: props.device_file,
            fs_type: props.fs_type,
            media_mask,
            mount_path: None,
        }
    }

    /// Handle for a device that has already gone away.
    ///
    /// Only the bus path and the last known device file survive removal.
    pub fn removed(path: impl Into<String>, device_file: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            device_file: device_file.into(),
            ..Self::default()
        }
    }

    fn compute_mask(props: &DeviceProperties) -> MediaMask {
        let mut mask = MediaMask::empty();
        mask.set(MediaMask::OPTICAL, props.optical);
        mask.set(MediaMask::MOUNTED, props.mounted);
        mask.set(MediaMask::PARTITION, props.partition);
        mask.set(MediaMask::AVAILABLE, props.available);

        match props.fs_type.as_str() {
            "iso9660" => mask |= MediaMask::FS_ISO9660,
            "udf" => mask |= MediaMask::FS_UDF,
            "vfat" => mask |= MediaMask::FS_VFAT,
            "" => mask |= MediaMask::FS_UNKNOWN,
            _ => {}
        }
        mask
    }

    /// Opaque bus identifier of the device.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// OS device node.
    pub fn native_path(&self) -> &str {
        &self.native_path
    }

    /// Device file used to open the raw device.
    pub fn device_file(&self) -> &str {
        &self.device_file
    }

    /// Filesystem type, empty if unknown.
    pub fn fs_type(&self) -> &str {
        &self.fs_type
    }

    /// Current flag set.
    pub fn media_mask(&self) -> MediaMask {
        self.media_mask
    }

    /// Whether every flag in `flags` is set.
    pub fn has(&self, flags: MediaMask) -> bool {
        self.media_mask.contains(flags)
    }

    /// Where the device was auto-mounted during this cycle.
    pub fn mount_path(&self) -> Option<&str> {
        self.mount_path.as_deref()
    }

    /// Whether a tester auto-mounted the device during this cycle.
    pub fn is_auto_mounted(&self) -> bool {
        self.mount_path.is_some()
    }

    pub(crate) fn set_mount_path(&mut self, mount_path: Option<String>) {
        self.mount_path = mount_path;
    }
}
