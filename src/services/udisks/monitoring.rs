use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};
use zbus::{Connection, MatchRule, MessageStream, fdo, message::Type as MessageType};

use super::{
    UDisksError,
    discovery::UDisksDiscovery,
    proxy::{BLOCK_DEVICES_PREFIX, BLOCK_INTERFACE, DRIVES_PREFIX, UDISKS_ROOT, UDISKS_SERVICE},
};
use crate::detector::{DeviceSignal, SignalKind};

const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Turns UDisks2 object manager and property signals into detector signals.
pub(crate) struct UDisksMonitoring;

impl UDisksMonitoring {
    /// Subscribes to the daemon and forwards signals until `signals` closes.
    pub(crate) async fn start(
        connection: Connection,
        signals: mpsc::Sender<DeviceSignal>,
    ) -> Result<JoinHandle<()>, UDisksError> {
        let object_manager = fdo::ObjectManagerProxy::builder(&connection)
            .destination(UDISKS_SERVICE)?
            .path(UDISKS_ROOT)?
            .build()
            .await?;

        let mut added = object_manager.receive_interfaces_added().await?;
        let mut removed = object_manager.receive_interfaces_removed().await?;

        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .sender(UDISKS_SERVICE)?
            .interface(PROPERTIES_INTERFACE)?
            .member("PropertiesChanged")?
            .path_namespace(UDISKS_ROOT)?
            .build();
        let mut changed = MessageStream::for_match_rule(rule, &connection, None).await?;

        let handle = tokio::spawn(async move {
            loop {
                let forwarded = tokio::select! {
                    Some(signal) = added.next() => match signal.args() {
                        Ok(args) => {
                            let has_block = args
                                .interfaces_and_properties
                                .keys()
                                .any(|name| name.as_str() == BLOCK_INTERFACE);
                            Self::forward_interfaces(&signals, args.object_path.as_str(), has_block, SignalKind::Added).await
                        }
                        Err(err) => Self::malformed("InterfacesAdded", err),
                    },
                    Some(signal) = removed.next() => match signal.args() {
                        Ok(args) => {
                            let has_block = args
                                .interfaces
                                .iter()
                                .any(|name| name.as_str() == BLOCK_INTERFACE);
                            Self::forward_interfaces(&signals, args.object_path.as_str(), has_block, SignalKind::Removed).await
                        }
                        Err(err) => Self::malformed("InterfacesRemoved", err),
                    },
                    Some(message) = changed.next() => match message {
                        Ok(message) => Self::forward_properties(&connection, &signals, &message).await,
                        Err(err) => Self::malformed("PropertiesChanged", err),
                    },
                    else => break,
                };

                if !forwarded {
                    debug!("Signal receiver dropped, stopping UDisks monitoring");
                    break;
                }
            }
        });

        Ok(handle)
    }

    /// Logs and skips a signal that could not be decoded. Returns `true` so
    /// the loop keeps running.
    fn malformed(signal: &'static str, reason: impl std::fmt::Display) -> bool {
        let err = UDisksError::MalformedSignal {
            signal,
            reason: reason.to_string(),
        };
        warn!(error = %err, "Skipping signal");
        true
    }

    async fn forward_interfaces(
        signals: &mpsc::Sender<DeviceSignal>,
        path: &str,
        has_block: bool,
        block_kind: SignalKind,
    ) -> bool {
        if !path.starts_with(BLOCK_DEVICES_PREFIX) {
            return true;
        }
        let kind = if has_block { block_kind } else { SignalKind::Changed };
        Self::send(signals, path, kind).await
    }

    async fn forward_properties(
        connection: &Connection,
        signals: &mpsc::Sender<DeviceSignal>,
        message: &zbus::Message,
    ) -> bool {
        let header = message.header();
        let Some(path) = header.path() else {
            return Self::malformed("PropertiesChanged", "no object path");
        };
        let path = path.as_str();

        if path.starts_with(BLOCK_DEVICES_PREFIX) {
            return Self::send(signals, path, SignalKind::Changed).await;
        }

        if path.starts_with(DRIVES_PREFIX) {
            match UDisksDiscovery::blocks_on_drive(connection, path).await {
                Ok(blocks) => {
                    for block in blocks {
                        if !Self::send(signals, &block, SignalKind::Changed).await {
                            return false;
                        }
                    }
                }
                Err(err) => warn!(drive = %path, error = %err, "Cannot list blocks of changed drive"),
            }
        }

        true
    }

    async fn send(signals: &mpsc::Sender<DeviceSignal>, path: &str, kind: SignalKind) -> bool {
        debug!(device = %path, %kind, "Forwarding device signal");
        signals.send(DeviceSignal::new(path, kind)).await.is_ok()
    }
}
