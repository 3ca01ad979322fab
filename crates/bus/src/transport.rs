use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::events::{InboundEvent, InventoryCheck, InventoryCheckReply, OutboundEvent};

/// Broker-assigned tag identifying an in-flight delivery.
pub type DeliveryTag = u64;

/// A single inbound delivery awaiting acknowledgment.
///
/// A delivery that is never acknowledged is redelivered by the broker, so
/// handlers must be idempotent.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub event: InboundEvent,
}

/// Publishing side of the event bus.
///
/// Implementations are injected into the coordinator and constructed once
/// per process; the transport guarantees at-least-once delivery and nothing
/// about ordering, so all correctness lives above this trait.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Opens the connection to the broker.
    async fn connect(&self) -> Result<()>;

    /// Closes the connection. Further calls fail with `NotConnected`.
    async fn close(&self) -> Result<()>;

    /// Publishes an event, fire-and-forget.
    ///
    /// Failures are reported to the caller but must never fail the business
    /// operation that triggered the publish.
    async fn emit(&self, event: OutboundEvent) -> Result<()>;

    /// Sends the `inventory.check` command and waits for a reply, up to
    /// `timeout`. A timeout or transport error means "no answer".
    async fn send(
        &self,
        command: InventoryCheck,
        timeout: Duration,
    ) -> Result<InventoryCheckReply>;
}

/// Consuming side of the event bus.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Waits for the next inbound delivery. Returns `None` once the
    /// subscription is closed.
    async fn next_delivery(&self) -> Option<Delivery>;

    /// Acknowledges a delivery, removing it from the redelivery window.
    async fn ack(&self, tag: DeliveryTag) -> Result<()>;
}
