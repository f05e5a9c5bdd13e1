use std::collections::HashMap;

use tracing::{debug, instrument};
use zbus::{
    Connection,
    proxy::CacheProperties,
    zvariant::{OwnedObjectPath, Value},
};

use super::{
    BlockProxy, DriveProxy, FilesystemProxy, ManagerProxy, PartitionProxy, UDisksError,
    proxy::{BLOCK_INTERFACE, DRIVE_INTERFACE, FILESYSTEM_INTERFACE, PARTITION_INTERFACE},
};
use crate::detector::DeviceProperties;

/// Empty path UDisks uses for "no object".
const NO_OBJECT: &str = "/";

/// Decodes a NUL terminated byte string property.
pub(crate) fn bytes_to_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Stateless lookups against the UDisks2 object tree.
pub(crate) struct UDisksDiscovery;

impl UDisksDiscovery {
    pub(crate) async fn block(
        connection: &Connection,
        device: &str,
    ) -> Result<BlockProxy<'static>, UDisksError> {
        Ok(BlockProxy::builder(connection)
            .path(device.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    pub(crate) async fn filesystem(
        connection: &Connection,
        device: &str,
    ) -> Result<FilesystemProxy<'static>, UDisksError> {
        Ok(FilesystemProxy::builder(connection)
            .path(device.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn partition(
        connection: &Connection,
        device: &str,
    ) -> Result<PartitionProxy<'static>, UDisksError> {
        Ok(PartitionProxy::builder(connection)
            .path(device.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn drive(connection: &Connection, drive: &str) -> Result<DriveProxy<'static>, UDisksError> {
        Ok(DriveProxy::builder(connection)
            .path(drive.to_string())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    /// Object paths of every block device.
    #[instrument(skip(connection))]
    pub(crate) async fn block_devices(connection: &Connection) -> Result<Vec<String>, UDisksError> {
        let manager = ManagerProxy::new(connection).await?;
        let paths = manager.get_block_devices(HashMap::new()).await?;
        debug!(count = paths.len(), "Block devices enumerated");
        Ok(paths.into_iter().map(|p| p.to_string()).collect())
    }

    /// Block device using `device_file`.
    #[instrument(skip(connection))]
    pub(crate) async fn resolve_device_file(
        connection: &Connection,
        device_file: &str,
    ) -> Result<String, UDisksError> {
        let manager = ManagerProxy::new(connection).await?;
        let devspec = HashMap::from([("path", Value::from(device_file))]);
        let paths: Vec<OwnedObjectPath> = manager.resolve_device(devspec, HashMap::new()).await?;

        paths
            .into_iter()
            .next()
            .map(|p| p.to_string())
            .ok_or_else(|| UDisksError::DeviceNotFound(device_file.to_string()))
    }

    /// Block devices belonging to the drive at `drive`.
    pub(crate) async fn blocks_on_drive(
        connection: &Connection,
        drive: &str,
    ) -> Result<Vec<String>, UDisksError> {
        let mut blocks = Vec::new();
        for path in Self::block_devices(connection).await? {
            let block = Self::block(connection, &path).await?;
            match block.drive().await {
                Ok(owner) if owner.as_str() == drive => blocks.push(path),
                Ok(_) => {}
                Err(err) => debug!(device = %path, error = %err, "Cannot read drive of block device"),
            }
        }
        Ok(blocks)
    }

    /// Current mount points of a filesystem.
    ///
    /// `NotSupported` if the device carries no filesystem.
    pub(crate) async fn mount_points(
        connection: &Connection,
        device: &str,
    ) -> Result<Vec<String>, UDisksError> {
        let filesystem = Self::filesystem(connection, device).await?;
        let points = filesystem
            .mount_points()
            .await
            .map_err(|err| UDisksError::from_call(err, device, FILESYSTEM_INTERFACE))?;
        Ok(points.iter().map(|p| bytes_to_string(p)).collect())
    }

    /// Reads the properties the detector classifies on.
    #[instrument(skip(connection))]
    pub(crate) async fn describe(
        connection: &Connection,
        device: &str,
    ) -> Result<DeviceProperties, UDisksError> {
        let block = Self::block(connection, device).await?;
        let in_block = |err| UDisksError::from_call(err, device, BLOCK_INTERFACE);

        let native_path = bytes_to_string(&block.device().await.map_err(in_block)?);
        let preferred = bytes_to_string(&block.preferred_device().await.map_err(in_block)?);
        let fs_type = block.id_type().await.map_err(in_block)?;
        let size = block.size().await.map_err(in_block)?;
        let drive_path = block.drive().await.map_err(in_block)?;

        let partition = match Self::partition(connection, device).await?.number().await {
            Ok(_) => true,
            Err(err) => match UDisksError::from_call(err, device, PARTITION_INTERFACE) {
                UDisksError::NotSupported { .. } => false,
                other => return Err(other),
            },
        };

        let mounted = match Self::mount_points(connection, device).await {
            Ok(points) => !points.is_empty(),
            Err(UDisksError::NotSupported { .. }) => false,
            Err(err) => return Err(err),
        };

        let (optical, available) = if drive_path.as_str() == NO_OBJECT {
            (false, size > 0)
        } else {
            let drive = Self::drive(connection, drive_path.as_str()).await?;
            let in_drive = |err| UDisksError::from_call(err, drive_path.as_str(), DRIVE_INTERFACE);
            let optical = drive.optical().await.map_err(in_drive)?;
            let media = drive.media_available().await.map_err(in_drive)?;
            (optical, media && size > 0)
        };

        let device_file = if preferred.is_empty() {
            native_path.clone()
        } else {
            preferred
        };

        Ok(DeviceProperties {
            native_path,
            device_file,
            fs_type,
            optical,
            mounted,
            partition,
            available,
        })
    }
}
