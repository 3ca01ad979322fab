//! Order creation and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use bus::EventBus;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use order_store::{CreateOrder, NewOrderItem, Order, OrderStatus, OrderStore};
use saga::SagaCoordinator;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<B: EventBus, S: OrderStore> {
    pub coordinator: Arc<SagaCoordinator<B, S>>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Option<String>,
    pub items: Vec<OrderItemRequest>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id.to_string(),
                quantity: item.quantity,
                price_cents: item.price.cents(),
                subtotal_cents: item.subtotal.cents(),
            })
            .collect();

        OrderResponse {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            total_cents: order.total_amount.cents(),
            notes: order.notes,
            payment_method: order.payment_method,
            payment_id: order.payment_id,
            created_at: order.created_at,
            completed_at: order.completed_at,
            cancelled_at: order.cancelled_at,
            items,
        }
    }
}

// -- Handlers --

/// POST /orders: create a new order in PENDING status.
#[tracing::instrument(skip(state, req))]
pub async fn create<B: EventBus + 'static, S: OrderStore + 'static>(
    State(state): State<Arc<AppState<B, S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let id_str = req
        .user_id
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;
    let uuid = uuid::Uuid::parse_str(&id_str)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;
    let user_id = UserId::from_uuid(uuid);

    let items: Vec<NewOrderItem> = req
        .items
        .iter()
        .map(|item| NewOrderItem {
            product_id: ProductId::new(item.product_id.as_str()),
            quantity: item.quantity,
            price: Money::from_cents(item.price_cents),
        })
        .collect();

    let mut cmd = CreateOrder::new(user_id, items);
    if let Some(notes) = req.notes {
        cmd = cmd.with_notes(notes);
    }
    if let Some(method) = req.payment_method {
        cmd = cmd.with_payment_method(method);
    }

    let order = state.coordinator.create(cmd).await?;

    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/:id: load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<B: EventBus + 'static, S: OrderStore + 'static>(
    State(state): State<Arc<AppState<B, S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order.into()))
}

/// GET /orders: list all orders, newest first, optionally filtered by
/// `?status=`.
#[tracing::instrument(skip(state))]
pub async fn list<B: EventBus + 'static, S: OrderStore + 'static>(
    State(state): State<Arc<AppState<B, S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let status = match query.status {
        Some(ref raw) => Some(OrderStatus::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Invalid status filter: {raw}"))
        })?),
        None => None,
    };

    let orders = state.store.list_all(status).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/user/:user_id: list a user's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_by_user<B: EventBus + 'static, S: OrderStore + 'static>(
    State(state): State<Arc<AppState<B, S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let uuid = uuid::Uuid::parse_str(&user_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;

    let orders = state.store.list_by_user(UserId::from_uuid(uuid)).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
