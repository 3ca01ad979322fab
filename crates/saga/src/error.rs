//! Saga error types.

use bus::TransportError;
use order_store::OrderStoreError;
use thiserror::Error;

/// Errors surfaced to the synchronous caller of the saga.
///
/// Only `create` can fail towards the caller; all event-handling failures
/// are internal and show up in logs and metrics instead.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Order store error.
    #[error("Order store error: {0}")]
    Store(#[from] OrderStoreError),

    /// Transport error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
