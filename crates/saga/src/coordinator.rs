//! The order saga state machine.

use std::sync::Arc;
use std::time::Duration;

use bus::{
    EventBus, EventItem, InboundEvent, InventoryCheck, InventoryCheckReply,
    InventoryConfirmedData, InventoryUpdatedData, OrderConfirmedData, OrderCreatedData,
    OrderRejectedData, OutboundEvent, PaymentConfirmedData, PaymentRejectedData, SCHEMA_VERSION,
    topics,
};
use chrono::Utc;
use common::OrderId;
use order_store::{CreateOrder, Order, OrderStore, TransitionOutcome};

use crate::error::SagaError;
use crate::guard::{GuardKey, IdempotencyGuard};

/// What the consumer should do with an inbound delivery after handling.
///
/// Everything permanent (success, idempotent no-op, stale conflict,
/// unknown order) is acknowledged. Only transient persistence failures
/// withhold the acknowledgment so the broker redelivers; redelivery is safe
/// because all transitions are idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge the delivery.
    Ack,

    /// Leave the delivery unacknowledged for broker redelivery.
    Redeliver,
}

/// Coordinates the order fulfillment saga.
///
/// Creates orders in PENDING status, publishes `order.created`, and
/// reconciles asynchronous payment/inventory events into a terminal
/// CONFIRMED or REJECTED state. Orders are fully independent of each other;
/// within one order, the store's compare-and-swap transition is the only
/// serialization point, so handlers need no ordering assumptions even for
/// events of the same order.
pub struct SagaCoordinator<B: EventBus, S: OrderStore> {
    bus: Arc<B>,
    store: S,
    guard: IdempotencyGuard,
    inventory_check_timeout: Duration,
}

impl<B: EventBus, S: OrderStore> SagaCoordinator<B, S> {
    /// Default timeout for the best-effort inventory check.
    pub const DEFAULT_INVENTORY_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a new coordinator over the given bus and store.
    pub fn new(bus: Arc<B>, store: S) -> Self {
        Self {
            bus,
            store,
            guard: IdempotencyGuard::default(),
            inventory_check_timeout: Self::DEFAULT_INVENTORY_CHECK_TIMEOUT,
        }
    }

    /// Overrides the inventory-check timeout.
    pub fn with_inventory_check_timeout(mut self, timeout: Duration) -> Self {
        self.inventory_check_timeout = timeout;
        self
    }

    /// Overrides the idempotency guard (e.g. to shorten its TTL).
    pub fn with_guard(mut self, guard: IdempotencyGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Creates an order in PENDING status and announces it.
    ///
    /// The returned order is already durable when the announcements go out;
    /// a failed `order.created` publish or inventory check is logged and
    /// never affects the result.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create(&self, request: CreateOrder) -> Result<Order, SagaError> {
        let order = self.store.create_order(request).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");

        let created = OutboundEvent::OrderCreated(OrderCreatedData {
            schema_version: SCHEMA_VERSION,
            order_id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            items: event_items(&order),
            payment_method: order.payment_method.clone(),
            created_at: order.created_at,
        });
        if let Err(e) = self.bus.emit(created).await {
            tracing::warn!(order_id = %order.id, error = %e, "failed to emit order.created");
        }

        self.check_inventory(&order).await;

        Ok(order)
    }

    /// Sends the best-effort `inventory.check` probe.
    ///
    /// The answer is logged but does not gate confirmation; a timeout or
    /// transport error leaves the order PENDING.
    async fn check_inventory(&self, order: &Order) {
        let command = InventoryCheck {
            schema_version: SCHEMA_VERSION,
            order_id: order.id,
            items: event_items(order),
        };

        match self.bus.send(command, self.inventory_check_timeout).await {
            Ok(InventoryCheckReply { available, .. }) => {
                tracing::info!(order_id = %order.id, available, "inventory check answered");
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %e,
                    "inventory check got no answer, order stays pending"
                );
            }
        }
    }

    /// Dispatches an inbound delivery to its handler.
    pub async fn handle(&self, event: InboundEvent) -> Disposition {
        match event {
            InboundEvent::PaymentConfirmed(data) => self.on_payment_confirmed(data).await,
            InboundEvent::PaymentRejected(data) => self.on_payment_rejected(data).await,
            InboundEvent::InventoryConfirmed(data) => self.on_inventory_confirmed(data).await,
            InboundEvent::InventoryUpdated(data) => self.on_inventory_updated(data).await,
        }
    }

    /// Handles `payment.confirmed`: PENDING → CONFIRMED.
    #[tracing::instrument(skip(self, data), fields(order_id = %data.order_id))]
    pub async fn on_payment_confirmed(&self, data: PaymentConfirmedData) -> Disposition {
        let key = GuardKey::with_token(
            data.order_id,
            topics::PAYMENT_CONFIRMED,
            data.payment_id.clone(),
        );
        if self.guard.already_applied(&key) {
            metrics::counter!("saga_duplicate_deliveries_total").increment(1);
            tracing::debug!(payment_id = %data.payment_id, "duplicate payment.confirmed, acknowledging");
            return Disposition::Ack;
        }

        match self
            .store
            .transition_to_confirmed(data.order_id, &data.payment_id)
            .await
        {
            Ok(TransitionOutcome::Applied(order)) => {
                let confirmed_at = order.completed_at.unwrap_or_else(Utc::now);
                let event = OutboundEvent::OrderConfirmed(OrderConfirmedData {
                    schema_version: SCHEMA_VERSION,
                    order_id: order.id,
                    user_id: order.user_id,
                    status: order.status.to_string(),
                    payment_id: data.payment_id,
                    confirmed_at,
                });
                if let Err(e) = self.bus.emit(event).await {
                    tracing::warn!(order_id = %order.id, error = %e, "failed to emit order.confirmed");
                }

                self.guard.record(key);
                metrics::counter!("orders_confirmed_total").increment(1);
                tracing::info!(order_id = %order.id, "order confirmed");
                Disposition::Ack
            }
            Ok(TransitionOutcome::AlreadyApplied(order)) => {
                // The state is already what this event asked for; record the
                // guard entry and acknowledge without emitting again.
                self.guard.record(key);
                tracing::debug!(order_id = %order.id, "payment.confirmed already applied");
                Disposition::Ack
            }
            Err(e) => self.dispose_failure(data.order_id, topics::PAYMENT_CONFIRMED, e),
        }
    }

    /// Handles `payment.rejected`: PENDING → REJECTED.
    #[tracing::instrument(skip(self, data), fields(order_id = %data.order_id))]
    pub async fn on_payment_rejected(&self, data: PaymentRejectedData) -> Disposition {
        let reason = format!("Payment rejected: {}", data.reason);
        self.reject(data.order_id, &reason, topics::PAYMENT_REJECTED)
            .await
    }

    /// Handles `inventory.confirmed`.
    ///
    /// Unavailable inventory rejects the order. Available inventory causes
    /// no transition; confirmation still awaits the payment event.
    #[tracing::instrument(skip(self, data), fields(order_id = %data.order_id))]
    pub async fn on_inventory_confirmed(&self, data: InventoryConfirmedData) -> Disposition {
        if data.available {
            tracing::debug!("inventory available, awaiting payment");
            return Disposition::Ack;
        }

        self.reject(
            data.order_id,
            "Insufficient inventory",
            topics::INVENTORY_CONFIRMED,
        )
        .await
    }

    /// Handles `inventory.updated`: informational only.
    pub async fn on_inventory_updated(&self, data: InventoryUpdatedData) -> Disposition {
        tracing::debug!(details = %data.details, "inventory updated");
        Disposition::Ack
    }

    /// Shared rejection path for payment and inventory failures.
    ///
    /// `order.rejected` is emitted only when the transition actually changed
    /// state, never on the idempotent no-op.
    async fn reject(
        &self,
        order_id: OrderId,
        reason: &str,
        event_kind: &'static str,
    ) -> Disposition {
        let key = GuardKey::new(order_id, event_kind);
        if self.guard.already_applied(&key) {
            metrics::counter!("saga_duplicate_deliveries_total").increment(1);
            tracing::debug!(%order_id, event_kind, "duplicate rejection event, acknowledging");
            return Disposition::Ack;
        }

        match self.store.transition_to_rejected(order_id, reason).await {
            Ok(TransitionOutcome::Applied(order)) => {
                let rejected_at = order.cancelled_at.unwrap_or_else(Utc::now);
                let event = OutboundEvent::OrderRejected(OrderRejectedData {
                    schema_version: SCHEMA_VERSION,
                    order_id: order.id,
                    user_id: order.user_id,
                    reason: reason.to_string(),
                    rejected_at,
                });
                if let Err(e) = self.bus.emit(event).await {
                    tracing::warn!(order_id = %order.id, error = %e, "failed to emit order.rejected");
                }

                self.guard.record(key);
                metrics::counter!("orders_rejected_total").increment(1);
                tracing::info!(order_id = %order.id, reason, "order rejected");
                Disposition::Ack
            }
            Ok(TransitionOutcome::AlreadyApplied(order)) => {
                self.guard.record(key);
                tracing::debug!(order_id = %order.id, "order already rejected, no event emitted");
                Disposition::Ack
            }
            Err(e) => self.dispose_failure(order_id, event_kind, e),
        }
    }

    /// Maps a transition failure to a delivery disposition.
    ///
    /// Conflicts and unknown orders are stale or duplicate messages, not new
    /// failures: they are logged and acknowledged, never retried, and never
    /// "fixed" by reapplying the winning transition. Transient store
    /// failures withhold the ack so the broker redelivers; a compensating
    /// rejection is never applied from a store failure alone.
    fn dispose_failure(
        &self,
        order_id: OrderId,
        event_kind: &'static str,
        error: order_store::OrderStoreError,
    ) -> Disposition {
        if error.is_transient() {
            metrics::counter!("saga_redeliveries_total").increment(1);
            tracing::error!(
                %order_id,
                event_kind,
                error = %error,
                "store unavailable, leaving delivery unacknowledged"
            );
            Disposition::Redeliver
        } else {
            metrics::counter!("saga_conflicts_total").increment(1);
            tracing::warn!(
                %order_id,
                event_kind,
                error = %error,
                "stale or conflicting event, acknowledging"
            );
            Disposition::Ack
        }
    }
}

fn event_items(order: &Order) -> Vec<EventItem> {
    order
        .items
        .iter()
        .map(|item| EventItem {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal,
        })
        .collect()
}
