use std::time::Duration;

use tracing::{debug, warn};

use super::{DeviceError, DeviceEventSource};

/// Retry policy for auto-mounting.
///
/// Other processes on the host may race to mount the same device, so a
/// mount is re-checked a few times before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountRetry {
    /// Total attempts, at least one is always made
    pub attempts: u32,
    /// Sleep between two attempts
    pub backoff: Duration,
}

impl Default for MountRetry {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Mounts `device` unless it is mounted already and returns its mount path.
///
/// # Errors
/// `DeviceError::NotSupported` straight away if the device has no
/// filesystem, `DeviceError::MountFailed` once all attempts are used up.
pub async fn auto_mount(
    source: &dyn DeviceEventSource,
    device: &str,
    retry: &MountRetry,
) -> Result<String, DeviceError> {
    let attempts = retry.attempts.max(1);

    for attempt in 1..=attempts {
        match try_mount(source, device).await {
            Ok(Some(mount_path)) => {
                debug!(device, mount_path, attempt, "Device mounted");
                return Ok(mount_path);
            }
            Ok(None) => debug!(device, attempt, "Device reports no mount path"),
            Err(err) if err.is_not_supported() => return Err(err),
            Err(err) => warn!(device, attempt, error = %err, "Mount attempt failed"),
        }

        if attempt < attempts {
            tokio::time::sleep(retry.backoff).await;
        }
    }

    Err(DeviceError::MountFailed {
        device: device.to_string(),
        attempts,
    })
}

async fn try_mount(source: &dyn DeviceEventSource, device: &str) -> Result<Option<String>, DeviceError> {
    if !source.is_mounted(device).await? {
        source.mount(device).await?;
    }

    let mount_path = source
        .mount_paths(device)
        .await?
        .into_iter()
        .find(|path| !path.is_empty());
    Ok(mount_path)
}
