//! Saga coordinator for asynchronous order fulfillment.
//!
//! Order creation, payment confirmation, and inventory verification happen
//! in independent services connected only by at-least-once, possibly
//! out-of-order messaging. This crate holds the coordinator that creates
//! orders in a provisional PENDING state, publishes domain events, and
//! reconciles later payment/inventory events into a final state.
//!
//! There is no distributed transaction coordinator. Consistency rests on
//! two mechanisms:
//! 1. the order store's compare-and-swap transitions, so two concurrent
//!    attempts for one order can never both succeed, and
//! 2. the idempotency guard, which acknowledges redelivered events without
//!    reapplying side effects.

pub mod consumer;
pub mod coordinator;
pub mod error;
pub mod guard;

pub use consumer::run_consumer;
pub use coordinator::{Disposition, SagaCoordinator};
pub use error::SagaError;
pub use guard::{GuardKey, IdempotencyGuard};
