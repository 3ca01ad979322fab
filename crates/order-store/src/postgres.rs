use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{OrderStoreError, Result};
use crate::order::{CreateOrder, Order, OrderItem, OrderStatus, TransitionOutcome};
use crate::store::OrderStore;

const ORDER_COLUMNS: &str = "id, user_id, status, total_amount_cents, notes, payment_method, \
                             payment_id, created_at, completed_at, cancelled_at";

/// PostgreSQL-backed order store implementation.
///
/// The compare-and-swap transitions are status-guarded UPDATEs: the row is
/// only changed when it is still PENDING, so concurrent transition attempts
/// are serialized by the database and exactly one can win.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str).ok_or_else(|| {
            OrderStoreError::Database(sqlx::Error::Decode(
                format!("unknown order status: {status_str}").into(),
            ))
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            notes: row.try_get("notes")?,
            payment_method: row.try_get("payment_method")?,
            payment_id: row.try_get("payment_id")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            completed_at: row.try_get("completed_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            items: Vec::new(),
        })
    }

    async fn fetch_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT product_id, quantity, price_cents, subtotal_cents \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    price: Money::from_cents(row.try_get("price_cents")?),
                    subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
                })
            })
            .collect()
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut order = Self::row_to_order(&row)?;
                order.items = self.fetch_items(order_id).await?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn attach_items(&self, orders: Vec<Order>) -> Result<Vec<Order>> {
        let mut result = Vec::with_capacity(orders.len());
        for mut order in orders {
            order.items = self.fetch_items(order.id).await?;
            result.push(order);
        }
        Ok(result)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, request: CreateOrder) -> Result<Order> {
        request.validate()?;

        let order_id = OrderId::new();
        let total_amount = request.total_amount();
        let created_at = Utc::now();

        // Order and items commit as a single failure unit.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, user_id, status, total_amount_cents, notes, \
             payment_method, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order_id.as_uuid())
        .bind(request.user_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(total_amount.cents())
        .bind(&request.notes)
        .bind(&request.payment_method)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let item = OrderItem::new(item.product_id.clone(), item.quantity, item.price);
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price_cents, \
                 subtotal_cents) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(item.quantity as i32)
            .bind(item.price.cents())
            .bind(item.subtotal.cents())
            .execute(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            user_id: request.user_id,
            status: OrderStatus::Pending,
            total_amount,
            notes: request.notes,
            payment_method: request.payment_method,
            payment_id: None,
            created_at,
            completed_at: None,
            cancelled_at: None,
            items,
        })
    }

    async fn transition_to_confirmed(
        &self,
        order_id: OrderId,
        payment_id: &str,
    ) -> Result<TransitionOutcome> {
        let updated = sqlx::query(&format!(
            "UPDATE orders SET status = 'CONFIRMED', payment_id = $2, completed_at = NOW() \
             WHERE id = $1 AND status = 'PENDING' RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            let mut order = Self::row_to_order(&row)?;
            order.items = self.fetch_items(order_id).await?;
            return Ok(TransitionOutcome::Applied(order));
        }

        // The CAS lost; classify against the current row.
        let current = self
            .fetch_order(order_id)
            .await?
            .ok_or(OrderStoreError::NotFound(order_id))?;

        match current.status {
            OrderStatus::Confirmed if current.payment_id.as_deref() == Some(payment_id) => {
                Ok(TransitionOutcome::AlreadyApplied(current))
            }
            status => Err(OrderStoreError::InvalidStateTransition {
                order_id,
                current: status,
                action: "confirm",
            }),
        }
    }

    async fn transition_to_rejected(
        &self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<TransitionOutcome> {
        let updated = sqlx::query(&format!(
            "UPDATE orders SET status = 'REJECTED', notes = $2, cancelled_at = NOW() \
             WHERE id = $1 AND status = 'PENDING' RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            let mut order = Self::row_to_order(&row)?;
            order.items = self.fetch_items(order_id).await?;
            return Ok(TransitionOutcome::Applied(order));
        }

        let current = self
            .fetch_order(order_id)
            .await?
            .ok_or(OrderStoreError::NotFound(order_id))?;

        match current.status {
            OrderStatus::Rejected => Ok(TransitionOutcome::AlreadyApplied(current)),
            status => Err(OrderStoreError::InvalidStateTransition {
                order_id,
                current: status,
                action: "reject",
            }),
        }
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.fetch_order(order_id).await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }

    async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 \
                     ORDER BY created_at DESC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }
}
