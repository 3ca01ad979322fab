//! Asynchronous event bus capability for the order saga services.
//!
//! The bus offers two primitives and deliberately nothing more:
//! - `emit`: fire-and-forget publish of a domain event, no delivery
//!   guarantee beyond at-least-once from the underlying broker.
//! - `send`: request/reply with an explicit timeout, used only for the
//!   best-effort inventory check.
//!
//! Payloads are typed, versioned enums rather than loose JSON so that every
//! topic has an explicit schema. The bus is an injected capability with an
//! explicit connect/close lifecycle; there is no ambient global client.

pub mod error;
pub mod events;
pub mod memory;
pub mod transport;

pub use error::TransportError;
pub use events::{
    EventItem, InboundEvent, InventoryCheck, InventoryCheckReply, InventoryConfirmedData,
    InventoryUpdatedData, OrderConfirmedData, OrderCreatedData, OrderRejectedData, OutboundEvent,
    PaymentConfirmedData, PaymentRejectedData, SCHEMA_VERSION, topics,
};
pub use memory::{CheckBehavior, InMemoryEventBus};
pub use transport::{Delivery, DeliveryTag, EventBus, EventConsumer};
