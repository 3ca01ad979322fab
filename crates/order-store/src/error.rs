use thiserror::Error;

use common::OrderId;

use crate::order::OrderStatus;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// A create request was malformed; nothing was persisted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// A transition was requested against a non-PENDING order that does not
    /// match the idempotent no-op case.
    #[error("Invalid state transition: cannot {action} order {order_id} in {current} state")]
    InvalidStateTransition {
        order_id: OrderId,
        current: OrderStatus,
        action: &'static str,
    },

    /// The store is temporarily unreachable.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OrderStoreError {
    /// Returns true if retrying later might succeed.
    ///
    /// Transient failures leave the triggering message unacknowledged so the
    /// broker redelivers it; everything else is permanent and acknowledged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OrderStoreError::Unavailable(_) | OrderStoreError::Database(_)
        )
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
