//! Background Tasks Module
//!
//! Optional tokio tasks that run alongside the throttle layer.
//!
//! # Tasks
//! - Expired-entry sweep: reclaims stale cache entries that are never read again

mod cleanup;

pub use cleanup::spawn_cleanup_task;
