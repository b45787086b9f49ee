//! Adaptive Rate Controller
//!
//! Paces calls to a target rate that grows multiplicatively on success and
//! shrinks multiplicatively on failure, clamped to configured bounds.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{system_clock, SharedClock};
use crate::error::{ensure_positive_rate, Result, ThrottleError};

// == Adaptive Rate Config ==
/// Bounds and step factors for an [`AdaptiveRateController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveRateConfig {
    /// Lowest permitted rate, calls per second; also the starting rate
    pub min_rate: f64,
    /// Highest permitted rate, calls per second
    pub max_rate: f64,
    /// Multiplier applied on success, > 1
    pub increase_factor: f64,
    /// Multiplier applied on failure, in (0, 1)
    pub decrease_factor: f64,
}

impl AdaptiveRateConfig {
    /// Checks every field, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        ensure_positive_rate("min_rate", self.min_rate)?;
        ensure_positive_rate("max_rate", self.max_rate)?;
        if self.max_rate < self.min_rate {
            return Err(ThrottleError::invalid(format!(
                "max_rate ({}) must not be below min_rate ({})",
                self.max_rate, self.min_rate
            )));
        }
        if !self.increase_factor.is_finite() || self.increase_factor <= 1.0 {
            return Err(ThrottleError::invalid(format!(
                "increase_factor must be greater than 1, got {}",
                self.increase_factor
            )));
        }
        if !(self.decrease_factor > 0.0 && self.decrease_factor < 1.0) {
            return Err(ThrottleError::invalid(format!(
                "decrease_factor must be between 0 and 1 exclusive, got {}",
                self.decrease_factor
            )));
        }
        Ok(())
    }
}

impl Default for AdaptiveRateConfig {
    fn default() -> Self {
        Self {
            min_rate: 1.0,
            max_rate: 10.0,
            increase_factor: 1.1,
            decrease_factor: 0.5,
        }
    }
}

#[derive(Debug)]
struct RateState {
    rate: f64,
    last_call_at: Option<Instant>,
}

// == Adaptive Rate Controller ==
/// Blocking call pacer with a feedback-driven rate.
///
/// `wait_for_slot` checks under the lock whether `1 / rate` has passed since
/// the previous call. If so it records the new call time in the same lock
/// section and returns; otherwise it sleeps for the remainder with the lock
/// released and checks again. Concurrent callers are released one per
/// interval, in no particular order.
#[derive(Debug)]
pub struct AdaptiveRateController {
    config: AdaptiveRateConfig,
    clock: SharedClock,
    state: Mutex<RateState>,
}

impl AdaptiveRateController {
    // == Constructors ==
    pub fn new(config: AdaptiveRateConfig) -> Result<Self> {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: AdaptiveRateConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            state: Mutex::new(RateState {
                rate: config.min_rate,
                last_call_at: None,
            }),
        })
    }

    /// A pacer pinned to `rate`: feedback is accepted but cannot move it.
    pub fn fixed(rate: f64) -> Result<Self> {
        Self::fixed_with_clock(rate, system_clock())
    }

    pub fn fixed_with_clock(rate: f64, clock: SharedClock) -> Result<Self> {
        let config = AdaptiveRateConfig {
            min_rate: rate,
            max_rate: rate,
            ..AdaptiveRateConfig::default()
        };
        Self::with_clock(config, clock)
    }

    /// Claims the slot if it is due, otherwise returns how long to wait.
    ///
    /// The due check and the `last_call_at` write share one lock section, so
    /// each slot goes to exactly one caller.
    fn try_claim_slot(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        if let Some(last) = state.last_call_at {
            let interval = Duration::try_from_secs_f64(1.0 / state.rate).unwrap_or(Duration::MAX);
            let elapsed = now.saturating_duration_since(last);
            if elapsed < interval {
                return Some(interval - elapsed);
            }
        }
        state.last_call_at = Some(now);
        None
    }

    // == Wait For Slot ==
    /// Blocks the calling thread until the next call may proceed.
    pub fn wait_for_slot(&self) {
        while let Some(wait) = self.try_claim_slot() {
            debug!(wait_ms = wait.as_millis() as u64, "waiting for rate slot");
            self.clock.sleep(wait);
        }
    }

    /// Async form of [`wait_for_slot`](Self::wait_for_slot) sleeping on tokio.
    ///
    /// Cancel-safe: dropping the future before it completes leaves the last
    /// call time untouched.
    pub async fn wait_for_slot_async(&self) {
        while let Some(wait) = self.try_claim_slot() {
            debug!(wait_ms = wait.as_millis() as u64, "waiting for rate slot");
            tokio::time::sleep(wait).await;
        }
    }

    // == Feedback ==
    /// Raises the rate by `increase_factor`, up to `max_rate`.
    pub fn on_success(&self) {
        let mut state = self.state.lock();
        let previous = state.rate;
        state.rate = (previous * self.config.increase_factor).min(self.config.max_rate);
        if state.rate != previous {
            debug!(from = previous, to = state.rate, "rate increased");
        }
    }

    /// Lowers the rate by `decrease_factor`, down to `min_rate`.
    pub fn on_failure(&self) {
        let mut state = self.state.lock();
        let previous = state.rate;
        state.rate = (previous * self.config.decrease_factor).max(self.config.min_rate);
        if state.rate != previous {
            debug!(from = previous, to = state.rate, "rate decreased");
        }
    }

    // == Rate Accessors ==
    /// The current rate rounded to two decimals, for display.
    pub fn current_rate(&self) -> f64 {
        (self.exact_rate() * 100.0).round() / 100.0
    }

    /// The current rate at full precision.
    pub fn exact_rate(&self) -> f64 {
        self.state.lock().rate
    }

    /// When the most recent call was let through, if any.
    pub fn last_call_at(&self) -> Option<Instant> {
        self.state.lock().last_call_at
    }

    pub fn config(&self) -> &AdaptiveRateConfig {
        &self.config
    }
}
