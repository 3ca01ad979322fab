//! Order model and status state machine.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{OrderStoreError, Result};

/// The status of an order.
///
/// Transitions are monotonic and one-way:
/// ```text
/// PENDING ──┬──► CONFIRMED
///           └──► REJECTED
/// ```
/// CONFIRMED and REJECTED are terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Awaiting payment and inventory confirmation.
    #[default]
    Pending,

    /// Payment confirmed (terminal).
    Confirmed,

    /// Rejected by payment or inventory (terminal).
    Rejected,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Rejected)
    }

    /// Returns the status name as it appears on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    /// Parses a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "REJECTED" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line in an order. Immutable after creation; owned exclusively by its
/// order for the order's whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Quantity ordered, at least 1.
    pub quantity: u32,

    /// Price per unit.
    pub price: Money,

    /// `price × quantity`, computed at creation.
    pub subtotal: Money,
}

impl OrderItem {
    /// Creates a new order item, computing the subtotal.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price,
            subtotal: price.multiply(quantity),
        }
    }
}

/// An order record.
///
/// Orders are never physically deleted; a terminal status plus its
/// timestamp is the only tombstone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,

    /// Sum of item subtotals at creation; never recomputed afterwards.
    pub total_amount: Money,

    pub notes: Option<String>,
    pub payment_method: Option<String>,

    /// Set only on confirmation.
    pub payment_id: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set when the order becomes CONFIRMED.
    pub completed_at: Option<DateTime<Utc>>,

    /// Set when the order becomes REJECTED.
    pub cancelled_at: Option<DateTime<Utc>>,

    pub items: Vec<OrderItem>,
}

/// An item in a create request, before the subtotal is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// Request to create an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

impl CreateOrder {
    /// Creates a request for the given user and items.
    pub fn new(user_id: UserId, items: Vec<NewOrderItem>) -> Self {
        Self {
            user_id,
            items,
            notes: None,
            payment_method: None,
        }
    }

    /// Attaches free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the payment method.
    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// Validates the request: at least one item, every quantity positive,
    /// no negative price, and all amounts representable.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(OrderStoreError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }

        let mut total = Money::zero();
        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderStoreError::Validation(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            if item.price.is_negative() {
                return Err(OrderStoreError::Validation(format!(
                    "price for product {} must not be negative",
                    item.product_id
                )));
            }

            let subtotal = item.price.checked_multiply(item.quantity).ok_or_else(|| {
                OrderStoreError::Validation(format!(
                    "subtotal for product {} exceeds the representable amount",
                    item.product_id
                ))
            })?;
            total = total.checked_add(subtotal).ok_or_else(|| {
                OrderStoreError::Validation(
                    "order total exceeds the representable amount".to_string(),
                )
            })?;
        }

        Ok(())
    }

    /// Returns the total amount across all items.
    pub fn total_amount(&self) -> Money {
        self.items
            .iter()
            .map(|item| item.price.multiply(item.quantity))
            .sum()
    }
}

/// Result of a compare-and-swap transition attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The status actually changed.
    Applied(Order),

    /// The order was already in the requested terminal state; nothing
    /// changed and no event should be emitted.
    AlreadyApplied(Order),
}

impl TransitionOutcome {
    /// Returns the order regardless of outcome.
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::AlreadyApplied(order) => order,
        }
    }

    /// Consumes the outcome, returning the order.
    pub fn into_order(self) -> Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::AlreadyApplied(order) => order,
        }
    }

    /// Returns true if the transition changed state.
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<NewOrderItem> {
        vec![
            NewOrderItem {
                product_id: ProductId::new("p1"),
                quantity: 2,
                price: Money::from_cents(1000),
            },
            NewOrderItem {
                product_id: ProductId::new("p2"),
                quantity: 1,
                price: Money::from_cents(500),
            },
        ]
    }

    #[test]
    fn status_transitions_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
    }

    #[test]
    fn status_parse_and_display() {
        assert_eq!(OrderStatus::parse("PENDING"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("confirmed"), Some(OrderStatus::Confirmed));
        assert_eq!(OrderStatus::parse("bogus"), None);
        assert_eq!(OrderStatus::Rejected.to_string(), "REJECTED");
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&OrderStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
    }

    #[test]
    fn item_subtotal_is_price_times_quantity() {
        let item = OrderItem::new("p1", 3, Money::from_cents(250));
        assert_eq!(item.subtotal.cents(), 750);
    }

    #[test]
    fn create_order_total() {
        let req = CreateOrder::new(UserId::new(), items());
        assert_eq!(req.total_amount().cents(), 2500);
    }

    #[test]
    fn validate_rejects_empty_items() {
        let req = CreateOrder::new(UserId::new(), vec![]);
        assert!(matches!(
            req.validate(),
            Err(OrderStoreError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_quantity() {
        let req = CreateOrder::new(
            UserId::new(),
            vec![NewOrderItem {
                product_id: ProductId::new("p1"),
                quantity: 0,
                price: Money::from_cents(100),
            }],
        );
        assert!(matches!(
            req.validate(),
            Err(OrderStoreError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_price() {
        let req = CreateOrder::new(
            UserId::new(),
            vec![NewOrderItem {
                product_id: ProductId::new("p1"),
                quantity: 1,
                price: Money::from_cents(-1),
            }],
        );
        assert!(matches!(
            req.validate(),
            Err(OrderStoreError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_overflowing_subtotal() {
        let req = CreateOrder::new(
            UserId::new(),
            vec![NewOrderItem {
                product_id: ProductId::new("p1"),
                quantity: 2,
                price: Money::from_cents(i64::MAX),
            }],
        );
        assert!(matches!(
            req.validate(),
            Err(OrderStoreError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_overflowing_total() {
        // Each subtotal fits on its own; only their sum overflows.
        let item = NewOrderItem {
            product_id: ProductId::new("p1"),
            quantity: 1,
            price: Money::from_cents(i64::MAX),
        };
        let req = CreateOrder::new(UserId::new(), vec![item.clone(), item]);
        assert!(matches!(
            req.validate(),
            Err(OrderStoreError::Validation(_))
        ));
    }

    #[test]
    fn validate_accepts_zero_price() {
        // Free items are allowed; only negative prices are invalid.
        let req = CreateOrder::new(
            UserId::new(),
            vec![NewOrderItem {
                product_id: ProductId::new("p1"),
                quantity: 1,
                price: Money::zero(),
            }],
        );
        assert!(req.validate().is_ok());
    }
}
