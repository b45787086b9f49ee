//! Throttle Cache - demo workload
//!
//! Wires the throttle layer from environment configuration and drives a
//! simulated flaky API through it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use throttle_cache::{
    spawn_cleanup_task, Config, Governor, Memoized, ThrottledCache, TokenBucket,
};

const REQUESTS: u64 = 20;
const DISTINCT_KEYS: u64 = 4;

#[derive(Debug, Error)]
#[error("simulated upstream failure on call {0}")]
struct SimulatedFailure(u64);

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the throttled cache, memoizer and token bucket
/// 4. Optionally start the expired-entry sweep
/// 5. Run the workload on a blocking thread until done or interrupted
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "throttle_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting throttle cache demo");

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: ttl={}s, rate={}..{}/s, bucket={}/s burst {}, memo_capacity={}",
        config.cache_ttl_secs,
        config.min_rate,
        config.max_rate,
        config.bucket_rate,
        config.bucket_capacity,
        config.memo_capacity
    );

    let layer: Arc<ThrottledCache<String, String>> = Arc::new(ThrottledCache::from_config(&config)?);
    let bucket = TokenBucket::new(config.bucket_rate, config.bucket_capacity)?;
    let square = Memoized::new(config.memo_capacity, |n: &u64| n * n)?;

    let cleanup_handle = config
        .cleanup_interval()
        .map(|interval| spawn_cleanup_task(layer.shared_cache(), interval));

    let stop = Arc::new(AtomicBool::new(false));
    let worker_layer = Arc::clone(&layer);
    let worker_stop = Arc::clone(&stop);
    let mut workload = tokio::task::spawn_blocking(move || {
        info!("square(4) = {}", square.call(4));
        info!("square(4) = {} (memoized)", square.call(4));
        run_fetches(&worker_layer, &worker_stop);
        run_bursts(&bucket, &worker_stop);
    });

    tokio::select! {
        result = &mut workload => result.context("workload thread panicked")?,
        _ = shutdown_signal() => {
            warn!("Interrupted, stopping early");
            stop.store(true, Ordering::SeqCst);
            workload.await.context("workload thread panicked")?;
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }

    let stats = layer.cache().stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    info!("Demo complete");
    Ok(())
}

/// Repeatedly fetches a handful of keys from a flaky upstream.
fn run_fetches(layer: &ThrottledCache<String, String>, stop: &AtomicBool) {
    let upstream_calls = AtomicU64::new(0);

    for i in 0..REQUESTS {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let key = format!("https://api.example.com/data/{}", i % DISTINCT_KEYS);

        let result = layer.fetch(key, |url| {
            let call = upstream_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call % 5 == 0 {
                Err(SimulatedFailure(call))
            } else {
                Ok(format!("sample response from {}", url))
            }
        });

        let rate = match layer.governor() {
            Governor::Adaptive(controller) => controller.current_rate(),
            Governor::Bucket(bucket) => bucket.rate(),
        };
        match result {
            Ok(_) => info!("[{}] ok | rate = {} req/s", i, rate),
            Err(e) => warn!("[{}] {} | rate = {} req/s", i, e, rate),
        }
    }
}

/// Fires requests every 100ms against the token bucket.
fn run_bursts(bucket: &TokenBucket, stop: &AtomicBool) {
    for i in 0..REQUESTS {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        if bucket.allow(1) {
            info!("Request {}: allowed", i);
        } else {
            info!("Request {}: rate limited", i);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating shutdown..."),
    }
}
