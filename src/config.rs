//! Configuration Module
//!
//! Handles loading and validating the throttle layer configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ensure_positive_rate, Result, ThrottleError};
use crate::limiter::AdaptiveRateConfig;

/// Throttle layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Time-to-live in seconds for cached results
    pub cache_ttl_secs: u64,
    /// Maximum number of memoized results
    pub memo_capacity: usize,
    /// Token bucket refill rate, tokens per second
    pub bucket_rate: f64,
    /// Token bucket burst size
    pub bucket_capacity: u32,
    /// Adaptive controller lower bound and starting rate, calls per second
    pub min_rate: f64,
    /// Adaptive controller upper bound, calls per second
    pub max_rate: f64,
    /// Rate multiplier applied after a successful call
    pub increase_factor: f64,
    /// Rate multiplier applied after a failed call
    pub decrease_factor: f64,
    /// Expired-entry sweep interval in seconds, 0 disables the sweeper
    pub cleanup_interval_secs: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECS` - Cache entry TTL in seconds (default: 10)
    /// - `MEMO_CAPACITY` - Memoizer capacity (default: 128)
    /// - `BUCKET_RATE` - Token refill rate per second (default: 5.0)
    /// - `BUCKET_CAPACITY` - Token bucket burst size (default: 10)
    /// - `MIN_RATE` / `MAX_RATE` - Adaptive rate bounds (default: 1.0 / 10.0)
    /// - `INCREASE_FACTOR` / `DECREASE_FACTOR` - Adaptive steps (default: 1.1 / 0.5)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds, 0 = off (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl_secs: env_or("CACHE_TTL_SECS", defaults.cache_ttl_secs),
            memo_capacity: env_or("MEMO_CAPACITY", defaults.memo_capacity),
            bucket_rate: env_or("BUCKET_RATE", defaults.bucket_rate),
            bucket_capacity: env_or("BUCKET_CAPACITY", defaults.bucket_capacity),
            min_rate: env_or("MIN_RATE", defaults.min_rate),
            max_rate: env_or("MAX_RATE", defaults.max_rate),
            increase_factor: env_or("INCREASE_FACTOR", defaults.increase_factor),
            decrease_factor: env_or("DECREASE_FACTOR", defaults.decrease_factor),
            cleanup_interval_secs: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval_secs),
        }
    }

    /// Applies the same checks the individual constructors do.
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(ThrottleError::invalid("cache_ttl_secs must be greater than zero"));
        }
        if self.memo_capacity == 0 {
            return Err(ThrottleError::invalid("memo_capacity must be greater than zero"));
        }
        ensure_positive_rate("bucket_rate", self.bucket_rate)?;
        if self.bucket_capacity == 0 {
            return Err(ThrottleError::invalid("bucket_capacity must be greater than zero"));
        }
        AdaptiveRateConfig::from(self).validate()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The sweep interval, or None when the sweeper is disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        let adaptive = AdaptiveRateConfig::default();
        Self {
            cache_ttl_secs: 10,
            memo_capacity: 128,
            bucket_rate: 5.0,
            bucket_capacity: 10,
            min_rate: adaptive.min_rate,
            max_rate: adaptive.max_rate,
            increase_factor: adaptive.increase_factor,
            decrease_factor: adaptive.decrease_factor,
            cleanup_interval_secs: 0,
        }
    }
}

impl From<&Config> for AdaptiveRateConfig {
    fn from(config: &Config) -> Self {
        Self {
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            increase_factor: config.increase_factor,
            decrease_factor: config.decrease_factor,
        }
    }
}
