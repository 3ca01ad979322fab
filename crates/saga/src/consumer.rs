//! Binds inbound bus deliveries to the coordinator's handlers.

use std::sync::Arc;

use bus::{EventBus, EventConsumer};
use order_store::OrderStore;

use crate::coordinator::{Disposition, SagaCoordinator};

/// Consumes inbound deliveries until the subscription closes.
///
/// Acknowledgment follows the handler's disposition: acknowledged
/// deliveries leave the redelivery window, unacknowledged ones come back
/// from the broker later. Deliveries are processed to completion; there is
/// no cancellation beyond process shutdown.
pub async fn run_consumer<B, S, C>(coordinator: Arc<SagaCoordinator<B, S>>, consumer: C)
where
    B: EventBus,
    S: OrderStore,
    C: EventConsumer,
{
    while let Some(delivery) = consumer.next_delivery().await {
        let topic = delivery.event.topic();
        tracing::debug!(topic, tag = delivery.tag, "delivery received");

        match coordinator.handle(delivery.event).await {
            Disposition::Ack => {
                if let Err(e) = consumer.ack(delivery.tag).await {
                    tracing::warn!(topic, tag = delivery.tag, error = %e, "ack failed");
                }
            }
            Disposition::Redeliver => {
                tracing::warn!(
                    topic,
                    tag = delivery.tag,
                    "delivery left unacknowledged for redelivery"
                );
            }
        }
    }

    tracing::info!("event consumer stopped");
}
