//! API usage metrics
//!
//! Two complementary surfaces:
//!
//! - [`ApiMetrics`]: a passive set of monotonic counters owned by one
//!   [`crate::client::ResilientClient`], readable at any time through
//!   [`ApiMetrics::snapshot`]. No reset operation is exposed.
//! - The `metrics` crate facade with an optional Prometheus scrape endpoint
//!   ([`init_metrics`]) for operational monitoring.
//!
//! Counter increments always hit the atomics; facade emission degrades to a
//! no-op when no recorder is installed.

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize the Prometheus scrape endpoint.
///
/// Idempotent; call once at startup. Collection works fine without this;
/// the per-client counters are always live.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "Total number of successful requests made to the Reddit API"
    );

    describe_counter!(
        "api_requests_failed_total",
        Unit::Count,
        "Total number of failed request attempts"
    );

    describe_counter!(
        "rate_limit_hits_total",
        Unit::Count,
        "Total number of acquisitions blocked or rejected by window capacity"
    );

    describe_counter!(
        "circuit_breaker_trips_total",
        Unit::Count,
        "Total number of calls rejected by an open circuit breaker"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if the Prometheus exporter was installed.
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Monotonic API usage counters for one client
#[derive(Debug, Default)]
pub struct ApiMetrics {
    requests_made: AtomicU64,
    requests_failed: AtomicU64,
    rate_limit_hits: AtomicU64,
    circuit_breaker_trips: AtomicU64,
}

/// Point-in-time view of [`ApiMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Successful requests made
    pub requests_made: u64,
    /// Failed request attempts
    pub requests_failed: u64,
    /// Acquisitions blocked or rejected by window capacity
    pub rate_limit_hits: u64,
    /// Calls rejected by an open breaker
    pub circuit_breaker_trips: u64,
}

impl ApiMetrics {
    /// Create a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful request.
    pub fn record_request(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        counter!("api_requests_total").increment(1);
    }

    /// Record one failed request attempt.
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        counter!("api_requests_failed_total").increment(1);
    }

    /// Record an acquisition blocked or rejected by window capacity.
    pub fn record_rate_limit_hit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        counter!("rate_limit_hits_total").increment(1);
    }

    /// Record a call rejected by an open breaker.
    pub fn record_breaker_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
        counter!("circuit_breaker_trips_total").increment(1);
    }

    /// Read all counters at once.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_made: self.requests_made.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
        }
    }
}
