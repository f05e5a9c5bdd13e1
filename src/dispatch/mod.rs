//! Delivery of detections to an action sink.
//!
//! The detector only produces `(description, keys, handle)`. The
//! [`Dispatcher`] hands them to an [`ActionSink`] in key order, pausing
//! between keys so the receiving side can keep up.

/// Dispatch errors
mod error;
/// Sink trait and built-in sinks
mod sink;

#[cfg(test)]
mod tests;

use std::time::Duration;

use tracing::{debug, instrument, warn};

pub use error::DispatchError;
pub use sink::{ActionSink, JsonSink, LogSink};

use crate::detector::{ActionKey, Detection};

/// Paces the actions of a detection into a sink.
pub struct Dispatcher {
    sink: Box<dyn ActionSink>,
    key_delay: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher waiting `key_delay` between consecutive actions.
    pub fn new(sink: Box<dyn ActionSink>, key_delay: Duration) -> Self {
        Self { sink, key_delay }
    }

    /// Delay between consecutive actions.
    pub fn key_delay(&self) -> Duration {
        self.key_delay
    }

    /// Announces `detection` and performs its actions in order.
    ///
    /// Script actions are reserved and skipped. Returns how many actions
    /// were performed.
    ///
    /// # Errors
    /// Returns the first sink error; later actions are not attempted.
    #[instrument(skip_all, fields(description = %detection.description))]
    pub async fn dispatch(&self, detection: &Detection) -> Result<usize, DispatchError> {
        self.sink.announce(detection).await?;

        let mut performed = 0;
        for key in &detection.keys {
            if let ActionKey::Script(name) = key {
                warn!(script = %name, "Script actions are not supported, skipping");
                continue;
            }

            if performed > 0 && !self.key_delay.is_zero() {
                tokio::time::sleep(self.key_delay).await;
            }

            debug!(%key, "Dispatching action");
            self.sink.perform(key).await?;
            performed += 1;
        }

        Ok(performed)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("key_delay", &self.key_delay)
            .finish_non_exhaustive()
    }
}
