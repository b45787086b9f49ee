//! Limiter Module
//!
//! Admission control in front of expensive or rate-limited calls: a
//! non-blocking token bucket and a blocking, feedback-driven pacer.

mod adaptive;
mod token_bucket;


pub use adaptive::{AdaptiveRateConfig, AdaptiveRateController};
pub use token_bucket::{BucketSnapshot, TokenBucket};
