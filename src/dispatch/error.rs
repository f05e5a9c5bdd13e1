use crate::detector::ActionKey;

/// Action dispatch errors
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    /// Sink could not write its output
    #[error("failed to write dispatch output: {0}")]
    Io(#[from] std::io::Error),

    /// Detection could not be encoded
    #[error("failed to encode detection: {0}")]
    Encode(#[from] serde_json::Error),

    /// Sink refused an action
    #[error("action '{key}' rejected: {reason}")]
    Rejected {
        /// The refused action
        key: ActionKey,
        /// Why the sink refused it
        reason: String,
    },
}
