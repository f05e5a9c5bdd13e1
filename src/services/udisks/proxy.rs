//! UDisks2 D-Bus proxy definitions.
//!
//! Only the members the detector reads are declared.

use std::collections::HashMap;

use zbus::{
    proxy,
    zvariant::{OwnedObjectPath, Value},
};

/// Well-known bus name of the UDisks2 daemon.
pub const UDISKS_SERVICE: &str = "org.freedesktop.UDisks2";
/// Root object carrying the object manager.
pub const UDISKS_ROOT: &str = "/org/freedesktop/UDisks2";
/// Prefix of every block device object.
pub const BLOCK_DEVICES_PREFIX: &str = "/org/freedesktop/UDisks2/block_devices/";
/// Prefix of every drive object.
pub const DRIVES_PREFIX: &str = "/org/freedesktop/UDisks2/drives/";

/// Block device interface name.
pub const BLOCK_INTERFACE: &str = "org.freedesktop.UDisks2.Block";
/// Filesystem interface name.
pub const FILESYSTEM_INTERFACE: &str = "org.freedesktop.UDisks2.Filesystem";
/// Partition interface name.
pub const PARTITION_INTERFACE: &str = "org.freedesktop.UDisks2.Partition";
/// Drive interface name.
pub const DRIVE_INTERFACE: &str = "org.freedesktop.UDisks2.Drive";

/// Daemon-wide operations.
#[proxy(
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2/Manager",
    interface = "org.freedesktop.UDisks2.Manager"
)]
pub trait Manager {
    /// Object paths of all block devices.
    fn get_block_devices(
        &self,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// Block devices matching a device specification such as `{"path": "/dev/sr0"}`.
    fn resolve_device(
        &self,
        devspec: HashMap<&str, Value<'_>>,
        options: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<Vec<OwnedObjectPath>>;
}

/// A block device.
#[proxy(
    default_service = "org.freedesktop.UDisks2",
    interface = "org.freedesktop.UDisks2.Block"
)]
pub trait Block {
    /// Special device file, NUL terminated.
    #[zbus(property)]
    fn device(&self) -> zbus::Result<Vec<u8>>;

    /// Preferred device file for presentation, NUL terminated.
    #[zbus(property)]
    fn preferred_device(&self) -> zbus::Result<Vec<u8>>;

    /// Drive the device belongs to, `/` if none.
    #[zbus(property)]
    fn drive(&self) -> zbus::Result<OwnedObjectPath>;

    /// Detected filesystem or content type.
    #[zbus(property)]
    fn id_type(&self) -> zbus::Result<String>;

    /// Size in bytes, zero without medium.
    #[zbus(property)]
    fn size(&self) -> zbus::Result<u64>;
}

/// A mountable filesystem on a block device.
#[proxy(
    default_service = "org.freedesktop.UDisks2",
    interface = "org.freedesktop.UDisks2.Filesystem"
)]
pub trait Filesystem {
    /// Mounts the filesystem and returns the mount path.
    fn mount(&self, options: HashMap<&str, Value<'_>>) -> zbus::Result<String>;

    /// Unmounts the filesystem.
    fn unmount(&self, options: HashMap<&str, Value<'_>>) -> zbus::Result<()>;

    /// Current mount points, each NUL terminated.
    #[zbus(property)]
    fn mount_points(&self) -> zbus::Result<Vec<Vec<u8>>>;
}

/// A partition of another block device.
#[proxy(
    default_service = "org.freedesktop.UDisks2",
    interface = "org.freedesktop.UDisks2.Partition"
)]
pub trait Partition {
    /// Partition number.
    #[zbus(property)]
    fn number(&self) -> zbus::Result<u32>;
}

/// A physical drive.
#[proxy(
    default_service = "org.freedesktop.UDisks2",
    interface = "org.freedesktop.UDisks2.Drive"
)]
pub trait Drive {
    /// Drive uses optical media.
    #[zbus(property)]
    fn optical(&self) -> zbus::Result<bool>;

    /// A medium is inserted.
    #[zbus(property)]
    fn media_available(&self) -> zbus::Result<bool>;
}
