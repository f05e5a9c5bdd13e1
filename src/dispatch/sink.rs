use std::{
    io::Write,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::DispatchError;
use crate::detector::{ActionKey, Detection};

/// Receiver of detections and the actions they carry.
#[async_trait]
pub trait ActionSink: Send + Sync {
    /// Called once per detection, before any of its actions.
    ///
    /// # Errors
    /// Returns an error if the sink cannot accept the detection, which
    /// cancels its actions.
    async fn announce(&self, detection: &Detection) -> Result<(), DispatchError>;

    /// Performs one action.
    ///
    /// # Errors
    /// Returns an error if the action fails; remaining actions are dropped.
    async fn perform(&self, key: &ActionKey) -> Result<(), DispatchError>;
}

/// Sink that only logs what it would do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ActionSink for LogSink {
    async fn announce(&self, detection: &Detection) -> Result<(), DispatchError> {
        info!(
            description = %detection.description,
            device = %detection.handle.device_file(),
            mount_path = ?detection.handle.mount_path(),
            "Media detected"
        );
        Ok(())
    }

    async fn perform(&self, key: &ActionKey) -> Result<(), DispatchError> {
        match key {
            ActionKey::Plugin(name) => info!(plugin = %name, "Invoking plugin"),
            ActionKey::Script(name) => info!(script = %name, "Running script"),
            ActionKey::Key(name) => info!(key = %name, "Pressing key"),
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum JsonEvent<'a> {
    Detected(&'a Detection),
    Action { key: &'a ActionKey },
}

/// Sink writing one JSON object per line.
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    /// Creates a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &JsonEvent<'_>) -> Result<(), DispatchError> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *out, event)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> ActionSink for JsonSink<W> {
    async fn announce(&self, detection: &Detection) -> Result<(), DispatchError> {
        self.emit(&JsonEvent::Detected(detection))
    }

    async fn perform(&self, key: &ActionKey) -> Result<(), DispatchError> {
        self.emit(&JsonEvent::Action { key })
    }
}
