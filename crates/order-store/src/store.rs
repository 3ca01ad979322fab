use async_trait::async_trait;
use common::{OrderId, UserId};

use crate::error::Result;
use crate::order::{CreateOrder, Order, OrderStatus, TransitionOutcome};

/// Core trait for order store implementations.
///
/// All implementations must serialize transition attempts for the same
/// order, either through a per-order lock or an optimistic status check at
/// the persistence layer, so that two concurrent transitions can never both
/// succeed. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Validates the request and persists the order with its items
    /// atomically, returning it in PENDING status.
    ///
    /// Fails with `Validation` if items are empty, any quantity is zero,
    /// or any price is negative.
    async fn create_order(&self, request: CreateOrder) -> Result<Order>;

    /// Compare-and-swap transition PENDING → CONFIRMED.
    ///
    /// Sets `payment_id` and `completed_at`. If the order is already
    /// CONFIRMED with the same payment ID, returns `AlreadyApplied`
    /// (idempotent success). Fails with `InvalidStateTransition` if
    /// CONFIRMED with a different payment ID or REJECTED, and with
    /// `NotFound` for an unknown order.
    async fn transition_to_confirmed(
        &self,
        order_id: OrderId,
        payment_id: &str,
    ) -> Result<TransitionOutcome>;

    /// Compare-and-swap transition PENDING → REJECTED.
    ///
    /// Sets `cancelled_at` and stores the reason into `notes`. If already
    /// REJECTED, returns `AlreadyApplied`. Fails with
    /// `InvalidStateTransition` if CONFIRMED (a rejection must never
    /// override a confirmed order) and with `NotFound` for an unknown
    /// order.
    async fn transition_to_rejected(
        &self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<TransitionOutcome>;

    /// Returns an order by ID, or `None` if it does not exist.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Returns a user's orders, newest first.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns all orders, newest first, optionally filtered by status.
    async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>>;
}
