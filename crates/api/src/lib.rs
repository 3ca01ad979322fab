//! HTTP API server with observability for the order saga.
//!
//! Provides REST endpoints for creating and querying orders, with
//! structured logging (tracing) and Prometheus metrics. Orders are created
//! here; their final state arrives later through the event consumer.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use bus::{EventBus, InMemoryEventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore};
use saga::SagaCoordinator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B: EventBus + 'static, S: OrderStore + 'static>(
    state: Arc<AppState<B, S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<B, S>))
        .route("/orders", get(routes::orders::list::<B, S>))
        .route("/orders/{id}", get(routes::orders::get::<B, S>))
        .route(
            "/orders/user/{user_id}",
            get(routes::orders::list_by_user::<B, S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the in-memory bus and store.
///
/// The bus is returned separately so the caller can connect it and run the
/// event consumer against it.
pub fn create_default_state(
    config: &config::Config,
) -> (
    Arc<AppState<InMemoryEventBus, InMemoryOrderStore>>,
    Arc<InMemoryEventBus>,
) {
    let bus = Arc::new(InMemoryEventBus::new());
    let store = InMemoryOrderStore::new();
    let coordinator = Arc::new(
        SagaCoordinator::new(bus.clone(), store.clone())
            .with_inventory_check_timeout(config.inventory_check_timeout),
    );

    let state = Arc::new(AppState { coordinator, store });

    (state, bus)
}
