//! Typed event payloads for every topic the order saga speaks.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// Current schema version carried by every payload.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Topic names as they appear on the wire.
pub mod topics {
    pub const ORDER_CREATED: &str = "order.created";
    pub const ORDER_CONFIRMED: &str = "order.confirmed";
    pub const ORDER_REJECTED: &str = "order.rejected";
    pub const PAYMENT_CONFIRMED: &str = "payment.confirmed";
    pub const PAYMENT_REJECTED: &str = "payment.rejected";
    pub const INVENTORY_CONFIRMED: &str = "inventory.confirmed";
    pub const INVENTORY_UPDATED: &str = "inventory.updated";
    pub const INVENTORY_CHECK: &str = "inventory.check";
}

/// An order line as carried in event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
}

/// Events the saga publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum OutboundEvent {
    #[serde(rename = "order.created")]
    OrderCreated(OrderCreatedData),

    #[serde(rename = "order.confirmed")]
    OrderConfirmed(OrderConfirmedData),

    #[serde(rename = "order.rejected")]
    OrderRejected(OrderRejectedData),
}

impl OutboundEvent {
    /// Returns the topic this event is published to.
    pub fn topic(&self) -> &'static str {
        match self {
            OutboundEvent::OrderCreated(_) => topics::ORDER_CREATED,
            OutboundEvent::OrderConfirmed(_) => topics::ORDER_CONFIRMED,
            OutboundEvent::OrderRejected(_) => topics::ORDER_REJECTED,
        }
    }
}

/// Payload for `order.created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub total_amount: Money,
    pub items: Vec<EventItem>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for `order.confirmed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: String,
    pub payment_id: String,
    pub confirmed_at: DateTime<Utc>,
}

/// Payload for `order.rejected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejectedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

/// Events the saga consumes from the payment and inventory services.
///
/// Delivery is at-least-once and unordered, even for the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum InboundEvent {
    #[serde(rename = "payment.confirmed")]
    PaymentConfirmed(PaymentConfirmedData),

    #[serde(rename = "payment.rejected")]
    PaymentRejected(PaymentRejectedData),

    #[serde(rename = "inventory.confirmed")]
    InventoryConfirmed(InventoryConfirmedData),

    #[serde(rename = "inventory.updated")]
    InventoryUpdated(InventoryUpdatedData),
}

impl InboundEvent {
    /// Returns the topic this event arrived on.
    pub fn topic(&self) -> &'static str {
        match self {
            InboundEvent::PaymentConfirmed(_) => topics::PAYMENT_CONFIRMED,
            InboundEvent::PaymentRejected(_) => topics::PAYMENT_REJECTED,
            InboundEvent::InventoryConfirmed(_) => topics::INVENTORY_CONFIRMED,
            InboundEvent::InventoryUpdated(_) => topics::INVENTORY_UPDATED,
        }
    }
}

/// Payload for `payment.confirmed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub payment_id: String,
}

/// Payload for `payment.rejected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRejectedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub reason: String,
}

/// Payload for `inventory.confirmed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfirmedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub available: bool,
}

/// Payload for `inventory.updated`. Informational only; the saga never
/// transitions on it, so the details stay opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUpdatedData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Request payload for the `inventory.check` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCheck {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub order_id: OrderId,
    pub items: Vec<EventItem>,
}

/// Reply payload for the `inventory.check` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCheckReply {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub available: bool,
}
