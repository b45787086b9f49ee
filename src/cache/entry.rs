//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value together with the instant it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Monotonic instant of the last write
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with `now`.
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was written.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    // == Is Expired ==
    /// Checks if the entry is stale under `ttl`.
    ///
    /// Boundary condition: an entry whose age equals `ttl` exactly is still
    /// fresh; it turns stale once the age is strictly greater. With no ttl
    /// the entry never expires.
    pub fn is_expired(&self, now: Instant, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.age(now) > ttl,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, `Some(ZERO)` once stale, or None if
    /// there is no ttl.
    pub fn ttl_remaining(&self, now: Instant, ttl: Option<Duration>) -> Option<Duration> {
        ttl.map(|ttl| ttl.saturating_sub(self.age(now)))
    }
}
