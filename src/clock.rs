//! Clock Module
//!
//! Monotonic time source shared by the caches and limiters. Production code
//! uses [`SystemClock`]; tests inject a [`ManualClock`] so that expiry and
//! refill behaviour can be driven without sleeping.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

// == Clock Trait ==
/// A monotonic time source that can also suspend the calling thread.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared handle used by every component that needs time.
pub type SharedClock = Arc<dyn Clock>;

/// Returns the default production clock.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

// == System Clock ==
/// Reads `std::time::Instant`, unaffected by wall-clock adjustments.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// == Tokio Clock ==
/// Reads tokio's clock, so paused test time (`start_paused`) is honoured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

// == Manual Clock ==
/// A clock that only moves when told to.
///
/// `sleep` advances the clock by the requested duration instead of blocking,
/// so code paths that wait can be tested deterministically.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }

    /// Total time this clock has been advanced since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
