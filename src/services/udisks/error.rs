use zbus::fdo;

use crate::detector::DeviceError;

const MISSING_MEMBER_ERRORS: [&str; 4] = [
    "org.freedesktop.DBus.Error.UnknownInterface",
    "org.freedesktop.DBus.Error.UnknownProperty",
    "org.freedesktop.DBus.Error.UnknownMethod",
    "org.freedesktop.DBus.Error.InvalidArgs",
];

/// UDisks2 service errors
#[derive(thiserror::Error, Debug)]
pub enum UDisksError {
    /// D-Bus communication error
    #[error("D-Bus operation failed: {0}")]
    DbusError(#[from] zbus::Error),

    /// Object lacks an interface or property, e.g. no filesystem on an audio CD
    #[error("{device} has no {interface}")]
    NotSupported {
        /// Object path
        device: String,
        /// Missing interface
        interface: &'static str,
    },

    /// No block device uses the given device file
    #[error("no block device for {0}")]
    DeviceNotFound(String),

    /// Signal did not carry the expected arguments
    #[error("malformed {signal} signal: {reason}")]
    MalformedSignal {
        /// Signal member name
        signal: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// UDisks operation failed
    #[error("UDisks operation failed: {operation} - {reason}")]
    OperationFailed {
        /// The operation that failed
        operation: &'static str,
        /// The reason the operation failed
        reason: String,
    },
}

impl UDisksError {
    /// Maps a call on `interface` of `device` to `NotSupported` when the
    /// object simply lacks that interface.
    pub(crate) fn from_call(err: zbus::Error, device: &str, interface: &'static str) -> Self {
        if is_missing_member(&err) {
            return UDisksError::NotSupported {
                device: device.to_string(),
                interface,
            };
        }
        UDisksError::DbusError(err)
    }

    /// Converts into the detector's error type, naming the operation.
    pub(crate) fn into_device_error(self, operation: &'static str) -> DeviceError {
        match self {
            UDisksError::NotSupported { device, interface } => DeviceError::NotSupported {
                device,
                interface: interface.to_string(),
            },
            UDisksError::DeviceNotFound(device) => DeviceError::NotFound(device),
            UDisksError::MalformedSignal { signal, reason } => {
                DeviceError::MalformedSignal(format!("{signal}: {reason}"))
            }
            UDisksError::DbusError(err) => DeviceError::Transport {
                operation,
                reason: err.to_string(),
            },
            UDisksError::OperationFailed { operation, reason } => {
                DeviceError::Transport { operation, reason }
            }
        }
    }
}

fn is_missing_member(err: &zbus::Error) -> bool {
    match err {
        zbus::Error::InterfaceNotFound => true,
        zbus::Error::MethodError(name, _, _) => MISSING_MEMBER_ERRORS.contains(&name.as_str()),
        zbus::Error::FDO(fdo_err) => matches!(
            **fdo_err,
            fdo::Error::UnknownInterface(_)
                | fdo::Error::UnknownProperty(_)
                | fdo::Error::UnknownMethod(_)
                | fdo::Error::InvalidArgs(_)
        ),
        _ => false,
    }
}
