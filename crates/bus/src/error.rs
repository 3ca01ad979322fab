use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the message transport.
///
/// Transport failures are never fatal for the saga: `emit` failures are
/// logged and swallowed by callers, and `send` failures are treated as
/// "no answer received".
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bus client is not connected.
    #[error("Bus is not connected")]
    NotConnected,

    /// Publishing to a topic failed.
    #[error("Publish to '{topic}' failed: {reason}")]
    Publish { topic: &'static str, reason: String },

    /// A request/reply command timed out.
    #[error("Request to '{topic}' timed out after {timeout:?}")]
    Timeout {
        topic: &'static str,
        timeout: Duration,
    },

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, TransportError>;
