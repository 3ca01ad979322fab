//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::OrderStoreError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order store error.
    Store(OrderStoreError),
    /// Saga execution error.
    Saga(SagaError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Saga(err) => match err {
                SagaError::Store(store_err) => store_error_to_response(store_err),
                SagaError::Transport(transport_err) => {
                    tracing::error!(error = %transport_err, "transport error");
                    (StatusCode::INTERNAL_SERVER_ERROR, transport_err.to_string())
                }
            },
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: OrderStoreError) -> (StatusCode, String) {
    match &err {
        OrderStoreError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        OrderStoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrderStoreError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        OrderStoreError::Unavailable(_) | OrderStoreError::Database(_) => {
            tracing::error!(error = %err, "order store error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<OrderStoreError> for ApiError {
    fn from(err: OrderStoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
