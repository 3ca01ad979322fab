//! Order-keyed persistent state for the saga coordinator.
//!
//! The store offers atomic create and compare-and-swap status transitions.
//! The CAS semantics of [`OrderStore::transition_to_confirmed`] and
//! [`OrderStore::transition_to_rejected`] are the single mechanism keeping
//! the saga consistent under concurrent and duplicate event delivery: two
//! concurrent transition attempts for the same order can never both succeed.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod store;

pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use order::{CreateOrder, NewOrderItem, Order, OrderItem, OrderStatus, TransitionOutcome};
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
