use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::events::{
    InboundEvent, InventoryCheck, InventoryCheckReply, OutboundEvent, SCHEMA_VERSION, topics,
};
use crate::transport::{Delivery, DeliveryTag, EventBus, EventConsumer};

/// How the in-memory bus answers the `inventory.check` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckBehavior {
    /// Reply with the given availability.
    Reply { available: bool },
    /// Fail the request with a publish error.
    Fail,
    /// Let the request time out.
    Timeout,
}

#[derive(Debug)]
struct InMemoryBusState {
    connected: bool,
    emitted: Vec<OutboundEvent>,
    fail_on_emit: bool,
    check_behavior: CheckBehavior,
    sent_checks: Vec<InventoryCheck>,
    pending: HashMap<DeliveryTag, InboundEvent>,
    next_tag: DeliveryTag,
}

impl Default for InMemoryBusState {
    fn default() -> Self {
        Self {
            connected: false,
            emitted: Vec::new(),
            fail_on_emit: false,
            check_behavior: CheckBehavior::Reply { available: true },
            sent_checks: Vec::new(),
            pending: HashMap::new(),
            next_tag: 0,
        }
    }
}

/// In-memory event bus for tests and local runs.
///
/// Provides the same interface as a broker-backed implementation, records
/// emitted events for assertions, and models at-least-once delivery:
/// inbound events stay pending until acknowledged and can be redelivered
/// with [`redeliver_unacked`](Self::redeliver_unacked).
#[derive(Clone)]
pub struct InMemoryEventBus {
    state: Arc<Mutex<InMemoryBusState>>,
    inbound_tx: mpsc::UnboundedSender<Delivery>,
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>>,
}

impl InMemoryEventBus {
    /// Creates a new disconnected in-memory bus.
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(InMemoryBusState::default())),
            inbound_tx,
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
        }
    }

    /// Configures the next `emit` calls to fail.
    pub fn set_fail_on_emit(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_emit = fail;
    }

    /// Configures how `inventory.check` commands are answered.
    pub fn set_check_behavior(&self, behavior: CheckBehavior) {
        self.state.lock().unwrap().check_behavior = behavior;
    }

    /// Returns all events emitted so far.
    pub fn emitted(&self) -> Vec<OutboundEvent> {
        self.state.lock().unwrap().emitted.clone()
    }

    /// Returns how many emitted events went to the given topic.
    pub fn emitted_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .emitted
            .iter()
            .filter(|e| e.topic() == topic)
            .count()
    }

    /// Returns the `inventory.check` commands sent so far.
    pub fn sent_checks(&self) -> Vec<InventoryCheck> {
        self.state.lock().unwrap().sent_checks.clone()
    }

    /// Delivers an inbound event to subscribers, returning its tag.
    pub fn publish_inbound(&self, event: InboundEvent) -> DeliveryTag {
        let mut state = self.state.lock().unwrap();
        state.next_tag += 1;
        let tag = state.next_tag;
        state.pending.insert(tag, event.clone());
        drop(state);

        // Receiver may be gone; the event stays pending for redelivery.
        let _ = self.inbound_tx.send(Delivery { tag, event });
        tag
    }

    /// Re-queues every unacknowledged delivery, returning how many.
    pub fn redeliver_unacked(&self) -> usize {
        let pending: Vec<Delivery> = {
            let state = self.state.lock().unwrap();
            state
                .pending
                .iter()
                .map(|(&tag, event)| Delivery {
                    tag,
                    event: event.clone(),
                })
                .collect()
        };

        let count = pending.len();
        for delivery in pending {
            let _ = self.inbound_tx.send(delivery);
        }
        count
    }

    /// Returns the number of deliveries not yet acknowledged.
    pub fn unacked_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn connect(&self) -> Result<()> {
        self.state.lock().unwrap().connected = true;
        tracing::debug!("in-memory bus connected");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().connected = false;
        tracing::debug!("in-memory bus closed");
        Ok(())
    }

    async fn emit(&self, event: OutboundEvent) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_on_emit {
            return Err(TransportError::Publish {
                topic: event.topic(),
                reason: "simulated publish failure".to_string(),
            });
        }
        state.emitted.push(event);
        Ok(())
    }

    async fn send(
        &self,
        command: InventoryCheck,
        timeout: Duration,
    ) -> Result<InventoryCheckReply> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            state.sent_checks.push(command);
            state.check_behavior
        };

        match behavior {
            CheckBehavior::Reply { available } => Ok(InventoryCheckReply {
                schema_version: SCHEMA_VERSION,
                available,
            }),
            CheckBehavior::Fail => Err(TransportError::Publish {
                topic: topics::INVENTORY_CHECK,
                reason: "simulated send failure".to_string(),
            }),
            CheckBehavior::Timeout => Err(TransportError::Timeout {
                topic: topics::INVENTORY_CHECK,
                timeout,
            }),
        }
    }
}

#[async_trait]
impl EventConsumer for InMemoryEventBus {
    async fn next_delivery(&self) -> Option<Delivery> {
        self.inbound_rx.lock().await.recv().await
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<()> {
        self.state.lock().unwrap().pending.remove(&tag);
        Ok(())
    }
}
