//! Bounded-lifetime record of already-applied inbound events.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::OrderId;

/// Key identifying one logical inbound event application.
///
/// The optional token disambiguates deliveries that are only duplicates
/// when their payload matches (e.g. the payment ID on `payment.confirmed`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardKey {
    order_id: OrderId,
    event_kind: &'static str,
    token: Option<String>,
}

impl GuardKey {
    /// Creates a key without a dedupe token.
    pub fn new(order_id: OrderId, event_kind: &'static str) -> Self {
        Self {
            order_id,
            event_kind,
            token: None,
        }
    }

    /// Creates a key with a dedupe token.
    pub fn with_token(order_id: OrderId, event_kind: &'static str, token: impl Into<String>) -> Self {
        Self {
            order_id,
            event_kind,
            token: Some(token.into()),
        }
    }
}

/// Prevents duplicate side effects from redelivered messages.
///
/// Entries record when an event was first applied and expire after a TTL.
/// The TTL only needs to cover the broker's maximum redelivery window;
/// beyond it the store's compare-and-swap transitions still make stale
/// deliveries harmless. Expired entries are evicted inside [`record`]
/// (at most once per TTL window) so the map cannot grow for the process
/// lifetime.
///
/// [`record`]: Self::record
#[derive(Debug)]
pub struct IdempotencyGuard {
    ttl: Duration,
    state: Mutex<GuardState>,
}

#[derive(Debug)]
struct GuardState {
    entries: HashMap<GuardKey, Instant>,
    last_purge: Instant,
}

impl IdempotencyGuard {
    /// Default entry lifetime, generous against typical broker redelivery
    /// windows.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

    /// Creates a guard with the given entry TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(GuardState {
                entries: HashMap::new(),
                last_purge: Instant::now(),
            }),
        }
    }

    /// Returns true if this event was already applied within the TTL.
    pub fn already_applied(&self, key: &GuardKey) -> bool {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(key)
            .is_some_and(|applied_at| applied_at.elapsed() < self.ttl)
    }

    /// Records a successful application. The first-applied timestamp is
    /// kept if a live entry for the key is already present; expired
    /// entries are evicted first.
    pub fn record(&self, key: GuardKey) {
        let mut state = self.state.lock().unwrap();
        if state.last_purge.elapsed() >= self.ttl {
            let ttl = self.ttl;
            state.entries.retain(|_, applied_at| applied_at.elapsed() < ttl);
            state.last_purge = Instant::now();
        }
        state.entries.entry(key).or_insert_with(Instant::now);
    }

    /// Drops expired entries, returning how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        let ttl = self.ttl;
        state
            .entries
            .retain(|_, applied_at| applied_at.elapsed() < ttl);
        state.last_purge = Instant::now();
        before - state.entries.len()
    }

    /// Returns the number of entries, including expired ones not yet
    /// purged.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Returns true if the guard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().entries.is_empty()
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
