use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, UserId};
use tokio::sync::RwLock;

use crate::error::{OrderStoreError, Result};
use crate::order::{CreateOrder, Order, OrderItem, OrderStatus, TransitionOutcome};
use crate::store::OrderStore;

/// In-memory order store implementation for testing and local runs.
///
/// Transitions take the write lock for the whole read-check-update, which
/// gives the same compare-and-swap guarantee as the status-guarded UPDATE
/// in the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the store being unreachable; every write fails with
    /// `Unavailable` until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OrderStoreError::Unavailable(
                "order store offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, request: CreateOrder) -> Result<Order> {
        request.validate()?;
        self.check_available()?;

        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|item| OrderItem::new(item.product_id.clone(), item.quantity, item.price))
            .collect();

        let order = Order {
            id: OrderId::new(),
            user_id: request.user_id,
            status: OrderStatus::Pending,
            total_amount: request.total_amount(),
            notes: request.notes,
            payment_method: request.payment_method,
            payment_id: None,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
            items,
        };

        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn transition_to_confirmed(
        &self,
        order_id: OrderId,
        payment_id: &str,
    ) -> Result<TransitionOutcome> {
        self.check_available()?;

        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(OrderStoreError::NotFound(order_id))?;

        match order.status {
            OrderStatus::Pending => {
                order.status = OrderStatus::Confirmed;
                order.payment_id = Some(payment_id.to_string());
                order.completed_at = Some(Utc::now());
                Ok(TransitionOutcome::Applied(order.clone()))
            }
            OrderStatus::Confirmed if order.payment_id.as_deref() == Some(payment_id) => {
                Ok(TransitionOutcome::AlreadyApplied(order.clone()))
            }
            current => Err(OrderStoreError::InvalidStateTransition {
                order_id,
                current,
                action: "confirm",
            }),
        }
    }

    async fn transition_to_rejected(
        &self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<TransitionOutcome> {
        self.check_available()?;

        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(OrderStoreError::NotFound(order_id))?;

        match order.status {
            OrderStatus::Pending => {
                order.status = OrderStatus::Rejected;
                order.notes = Some(reason.to_string());
                order.cancelled_at = Some(Utc::now());
                Ok(TransitionOutcome::Applied(order.clone()))
            }
            OrderStatus::Rejected => Ok(TransitionOutcome::AlreadyApplied(order.clone())),
            current => Err(OrderStoreError::InvalidStateTransition {
                order_id,
                current,
                action: "reject",
            }),
        }
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}
