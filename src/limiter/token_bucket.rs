//! Token Bucket Module
//!
//! Non-blocking admission control with continuous refill.

use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::clock::{system_clock, SharedClock};
use crate::error::{ensure_positive_rate, Result, ThrottleError};

/// Point-in-time view of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketSnapshot {
    /// Tokens added per second
    pub rate: f64,
    /// Maximum number of tokens held
    pub capacity: u32,
    /// Tokens available right now, refill included
    pub tokens: f64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

// == Token Bucket ==
/// Token bucket rate limiter.
///
/// Tokens accumulate at `rate` per second up to `capacity`, and each admitted
/// call spends `cost` of them. The bucket starts full, so up to `capacity`
/// calls may burst through before the rate applies.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: u32,
    clock: SharedClock,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    // == Constructor ==
    /// Creates a full bucket refilling at `rate` tokens per second.
    pub fn new(rate: f64, capacity: u32) -> Result<Self> {
        Self::with_clock(rate, capacity, system_clock())
    }

    /// Same as [`new`](Self::new) with an injected time source.
    pub fn with_clock(rate: f64, capacity: u32, clock: SharedClock) -> Result<Self> {
        ensure_positive_rate("rate", rate)?;
        if capacity == 0 {
            return Err(ThrottleError::invalid("capacity must be greater than zero"));
        }

        let now = clock.now();
        Ok(Self {
            rate,
            capacity,
            clock,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: now,
            }),
        })
    }

    fn refilled(&self, state: &BucketState, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        (state.tokens + elapsed * self.rate).min(self.capacity as f64)
    }

    // == Allow ==
    /// Refills for the time elapsed since the previous call, then spends
    /// `cost` tokens if that many are available.
    ///
    /// The refill is kept even when the call is rejected. A `cost` above the
    /// capacity can never be admitted. The clock is read under the lock and
    /// the refill mark never moves backwards, so elapsed time is credited
    /// once.
    pub fn allow(&self, cost: u32) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now();

        state.tokens = self.refilled(&state, now);
        state.last_refill = state.last_refill.max(now);

        let cost = cost as f64;
        if state.tokens >= cost {
            state.tokens -= cost;
            true
        } else {
            trace!(tokens = state.tokens, cost, "token bucket rejected call");
            false
        }
    }

    // == Snapshot ==
    /// Reports the current token level without consuming or storing a refill.
    pub fn snapshot(&self) -> BucketSnapshot {
        let state = self.state.lock();
        let now = self.clock.now();
        BucketSnapshot {
            rate: self.rate,
            capacity: self.capacity,
            tokens: self.refilled(&state, now),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
