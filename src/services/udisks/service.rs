use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, instrument};
use zbus::Connection;

use super::{
    UDisksError,
    discovery::UDisksDiscovery,
    monitoring::UDisksMonitoring,
    proxy::FILESYSTEM_INTERFACE,
};
use crate::detector::{DeviceError, DeviceEventSource, DeviceProperties, DeviceSignal};

/// Signals buffered between the monitoring task and the detector.
const SIGNAL_BUFFER: usize = 64;

/// Device event source backed by the UDisks2 daemon on the system bus.
///
/// Owns a background task that watches the daemon's object manager and
/// property signals. The task stops when the source is dropped.
pub struct UDisksEventSource {
    connection: Connection,
    signals: Mutex<mpsc::Receiver<DeviceSignal>>,
    monitor: JoinHandle<()>,
}

impl UDisksEventSource {
    /// Connects to the system bus and starts watching UDisks2.
    ///
    /// # Errors
    ///
    /// Returns `UDisksError::DbusError` if the bus is unreachable or the
    /// daemon's signals cannot be subscribed to.
    #[instrument]
    pub async fn connect() -> Result<Self, UDisksError> {
        let connection = Connection::system().await?;
        Self::with_connection(connection).await
    }

    /// Starts watching UDisks2 over an existing connection.
    ///
    /// # Errors
    ///
    /// Returns `UDisksError::DbusError` if the subscriptions fail.
    pub async fn with_connection(connection: Connection) -> Result<Self, UDisksError> {
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let monitor = UDisksMonitoring::start(connection.clone(), tx).await?;
        info!("Watching UDisks2 for device changes");

        Ok(Self {
            connection,
            signals: Mutex::new(rx),
            monitor,
        })
    }

    fn no_options() -> HashMap<&'static str, zbus::zvariant::Value<'static>> {
        HashMap::new()
    }
}

impl Drop for UDisksEventSource {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

#[async_trait]
impl DeviceEventSource for UDisksEventSource {
    async fn wait_for_signal(&self, timeout: Duration) -> Result<Option<DeviceSignal>, DeviceError> {
        let mut signals = self.signals.lock().await;
        match tokio::time::timeout(timeout, signals.recv()).await {
            Ok(Some(signal)) => Ok(Some(signal)),
            Ok(None) => Err(DeviceError::Closed),
            Err(_) => Ok(None),
        }
    }

    async fn describe(&self, device: &str) -> Result<DeviceProperties, DeviceError> {
        UDisksDiscovery::describe(&self.connection, device)
            .await
            .map_err(|err| err.into_device_error("describe"))
    }

    async fn is_mounted(&self, device: &str) -> Result<bool, DeviceError> {
        UDisksDiscovery::mount_points(&self.connection, device)
            .await
            .map(|points| !points.is_empty())
            .map_err(|err| err.into_device_error("is_mounted"))
    }

    async fn mount(&self, device: &str) -> Result<String, DeviceError> {
        let filesystem = UDisksDiscovery::filesystem(&self.connection, device)
            .await
            .map_err(|err| err.into_device_error("mount"))?;

        let path = filesystem
            .mount(Self::no_options())
            .await
            .map_err(|err| {
                UDisksError::from_call(err, device, FILESYSTEM_INTERFACE).into_device_error("mount")
            })?;

        debug!(device, mount_path = %path, "Mounted");
        Ok(path)
    }

    async fn unmount(&self, device: &str) -> Result<(), DeviceError> {
        let filesystem = UDisksDiscovery::filesystem(&self.connection, device)
            .await
            .map_err(|err| err.into_device_error("unmount"))?;

        filesystem
            .unmount(Self::no_options())
            .await
            .map_err(|err| {
                UDisksError::from_call(err, device, FILESYSTEM_INTERFACE)
                    .into_device_error("unmount")
            })?;

        debug!(device, "Unmounted");
        Ok(())
    }

    async fn mount_paths(&self, device: &str) -> Result<Vec<String>, DeviceError> {
        UDisksDiscovery::mount_points(&self.connection, device)
            .await
            .map_err(|err| err.into_device_error("mount_paths"))
    }

    async fn enumerate_devices(&self) -> Result<Vec<String>, DeviceError> {
        UDisksDiscovery::block_devices(&self.connection)
            .await
            .map_err(|err| err.into_device_error("enumerate_devices"))
    }

    async fn find_device_by_file(&self, device_file: &str) -> Result<String, DeviceError> {
        UDisksDiscovery::resolve_device_file(&self.connection, device_file)
            .await
            .map_err(|err| err.into_device_error("find_device_by_file"))
    }
}
