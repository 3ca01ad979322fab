//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bus::{EventBus, InMemoryEventBus, topics};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore};
use tower::ServiceExt;

use api::config::Config;
use api::routes::orders::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (
    axum::Router,
    Arc<AppState<InMemoryEventBus, InMemoryOrderStore>>,
    Arc<InMemoryEventBus>,
) {
    let config = Config {
        inventory_check_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let (state, bus) = api::create_default_state(&config);
    bus.connect().await.unwrap();
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state, bus)
}

fn create_order_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order() {
    let (app, _, bus) = setup().await;

    let response = app
        .oneshot(create_order_request(serde_json::json!({
            "user_id": uuid::Uuid::new_v4().to_string(),
            "items": [
                { "product_id": "p1", "quantity": 2, "price_cents": 1000 },
                { "product_id": "p2", "quantity": 1, "price_cents": 500 }
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = response_json(response).await;
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["total_cents"], 2500);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert!(json["id"].as_str().is_some());

    assert_eq!(bus.emitted_count(topics::ORDER_CREATED), 1);
}

#[tokio::test]
async fn test_create_order_with_empty_items_is_rejected() {
    let (app, _, bus) = setup().await;

    let response = app
        .oneshot(create_order_request(serde_json::json!({
            "user_id": uuid::Uuid::new_v4().to_string(),
            "items": []
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(bus.emitted_count(topics::ORDER_CREATED), 0);
}

#[tokio::test]
async fn test_create_order_requires_user_id() {
    let (app, state, bus) = setup().await;

    let response = app
        .oneshot(create_order_request(serde_json::json!({
            "items": [{ "product_id": "p1", "quantity": 1, "price_cents": 100 }]
        })))
        .await
        .unwrap();

    // No order may be attributed to a made-up user.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(state.store.list_all(None).await.unwrap().is_empty());
    assert_eq!(bus.emitted_count(topics::ORDER_CREATED), 0);
}

#[tokio::test]
async fn test_create_order_with_invalid_user_id() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(create_order_request(serde_json::json!({
            "user_id": "not-a-uuid",
            "items": [{ "product_id": "p1", "quantity": 1, "price_cents": 100 }]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let (app, _, _) = setup().await;

    let create_response = app
        .clone()
        .oneshot(create_order_request(serde_json::json!({
            "user_id": uuid::Uuid::new_v4().to_string(),
            "items": [{ "product_id": "p1", "quantity": 2, "price_cents": 1000 }],
            "notes": "leave at the door",
            "payment_method": "card"
        })))
        .await
        .unwrap();

    let created = response_json(create_response).await;
    let order_id = created["id"].as_str().unwrap();

    let get_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);

    let order = response_json(get_response).await;
    assert_eq!(order["id"], order_id);
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["total_cents"], 2000);
    assert_eq!(order["notes"], "leave at the door");
    assert_eq!(order["payment_method"], "card");
    assert_eq!(order["payment_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let (app, _, _) = setup().await;
    let fake_id = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{fake_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_order_with_malformed_id() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_with_status_filter() {
    let (app, state, _) = setup().await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(create_order_request(serde_json::json!({
                "user_id": uuid::Uuid::new_v4().to_string(),
                "items": [{ "product_id": "p1", "quantity": 1, "price_cents": 500 }]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Confirm one of the two directly through the store.
    let pending = state.store.list_all(None).await.unwrap();
    assert_eq!(pending.len(), 2);
    state
        .store
        .transition_to_confirmed(pending[0].id, "pay1")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/orders?status=CONFIRMED")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let orders = response_json(response).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "CONFIRMED");
    assert_eq!(orders[0]["payment_id"], "pay1");

    // Unfiltered list returns both, newest first.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let orders = response_json(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_orders_with_invalid_status_filter() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders?status=SHIPPED")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_by_user() {
    let (app, _, _) = setup().await;
    let user_id = uuid::Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(create_order_request(serde_json::json!({
            "user_id": user_id.to_string(),
            "items": [{ "product_id": "p1", "quantity": 1, "price_cents": 500 }]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // An order for a different user must not show up.
    app.clone()
        .oneshot(create_order_request(serde_json::json!({
            "user_id": uuid::Uuid::new_v4().to_string(),
            "items": [{ "product_id": "p2", "quantity": 1, "price_cents": 700 }]
        })))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/user/{user_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let orders = response_json(response).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user_id"], user_id.to_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
