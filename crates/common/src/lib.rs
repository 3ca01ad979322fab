//! Shared types used across the order saga services.

mod types;

pub use types::{Money, OrderId, ProductId, UserId};
