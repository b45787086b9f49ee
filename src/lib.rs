//! Throttle Cache - an in-process throttled cache layer
//!
//! Protects and speeds up calls to an external resource with a TTL cache, an
//! LRU memoizer, a token bucket and an adaptive rate controller.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod tasks;
pub mod throttle;

pub use cache::{CacheStats, ExpiringCache, LruCache, Memoized};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock, TokioClock};
pub use config::Config;
pub use error::{FetchError, Result, ThrottleError};
pub use limiter::{AdaptiveRateConfig, AdaptiveRateController, BucketSnapshot, TokenBucket};
pub use tasks::spawn_cleanup_task;
pub use throttle::{Governor, ThrottledCache};
