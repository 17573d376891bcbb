//! Resilient call wrapper composing breaker, rate limiter, and retry
//!
//! Every upstream call goes through [`ResilientClient::execute`]:
//!
//! 1. Consult the circuit breaker. Rejection fails immediately with
//!    [`ApiError::CircuitOpen`]: no rate-limiter acquisition, no
//!    `requests_made` increment, only a breaker-trip count.
//! 2. Acquire a rate-limiter slot (may suspend).
//! 3. Invoke the operation. Success records a breaker success and
//!    `requests_made`.
//! 4. Transient failures sleep an exponential backoff and retry from step 1
//!    (the breaker is re-checked each attempt). One breaker failure is
//!    recorded only when retries are exhausted; a call that eventually
//!    succeeds never counts against the breaker.
//! 5. Permanent failures record a breaker failure and propagate with no
//!    retry.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::client::breaker::{BreakerState, CircuitBreaker};
use crate::client::config::{ClientConfig, RetryPolicy};
use crate::client::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::client::ApiError;
use crate::metrics::{ApiMetrics, MetricsSnapshot};

/// Rate-limited, breaker-protected, retrying call wrapper.
///
/// Owns its limiter and breaker state explicitly; construct one client per
/// upstream quota and share it (via `Arc`) among everything that draws on
/// that quota.
pub struct ResilientClient {
    rate_limiter: RateLimiter,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    metrics: Arc<ApiMetrics>,
    cancel: Option<CancelToken>,
}

impl ResilientClient {
    /// Create a client from a config.
    pub fn new(config: ClientConfig) -> Self {
        let limiter_config = RateLimiterConfig::new(config.max_requests, config.window_duration)
            .with_base_delay(config.base_delay)
            .with_fail_fast(config.fail_fast);

        Self {
            rate_limiter: RateLimiter::new(limiter_config),
            breaker: CircuitBreaker::new(config.breaker_threshold, config.breaker_cooldown),
            retry: config.retry,
            metrics: Arc::new(ApiMetrics::new()),
            cancel: None,
        }
    }

    /// Attach a cancellation token so backoff sleeps abort early.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Shared handle to this client's usage counters.
    pub fn metrics(&self) -> Arc<ApiMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Point-in-time usage counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Current breaker state, for observability.
    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(|c| c.is_cancelled()).unwrap_or(false)
    }

    async fn backoff_sleep(&self, attempt: u32) -> Result<(), ApiError> {
        let delay = self.retry.backoff_delay(attempt);
        warn!(
            attempt = attempt + 1,
            max_retries = self.retry.max_retries,
            backoff_ms = delay.as_millis() as u64,
            "Transient failure, retrying after backoff"
        );
        match &self.cancel {
            Some(cancel) => {
                if cancel.sleep(delay).await {
                    Ok(())
                } else {
                    Err(ApiError::Cancelled)
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    /// Execute one logical API call with rate limiting, breaker protection,
    /// and exponential-backoff retry.
    ///
    /// `op` is invoked once per attempt; it must be cheap to rebuild the
    /// future (clone the inputs into it).
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if self.cancelled() {
                return Err(ApiError::Cancelled);
            }

            if let Err(e) = self.breaker.try_acquire() {
                self.metrics.record_breaker_trip();
                return Err(e);
            }
            // try_acquire only puts the breaker in HalfOpen when it admits
            // this caller as the trial, so observing HalfOpen here means we
            // hold the probe and must report its outcome.
            let holding_probe = self.breaker.state() == BreakerState::HalfOpen;

            let grant = match self.rate_limiter.acquire().await {
                Ok(grant) => grant,
                Err(_) => {
                    self.metrics.record_rate_limit_hit();
                    if holding_probe {
                        self.breaker.record_failure();
                    }
                    return Err(ApiError::RateLimitExceeded);
                }
            };
            if grant.window_limited {
                self.metrics.record_rate_limit_hit();
            }

            match op().await {
                Ok(value) => {
                    self.breaker.record_success();
                    self.metrics.record_request();
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    self.metrics.record_failure();
                    if holding_probe {
                        // Probe failed: reopen immediately, do not burn
                        // retries against a breaker that just reopened.
                        self.breaker.record_failure();
                        return Err(err);
                    }
                    if attempt < self.retry.max_retries {
                        self.backoff_sleep(attempt).await?;
                        attempt += 1;
                        continue;
                    }
                    self.breaker.record_failure();
                    return Err(err);
                }
                Err(ApiError::Permanent(msg)) => {
                    self.metrics.record_failure();
                    self.breaker.record_failure();
                    return Err(ApiError::Permanent(msg));
                }
                Err(other) => {
                    // Cancellation or a mis-classified limiter error from the
                    // operation itself: propagate without breaker accounting.
                    return Err(other);
                }
            }
        }
    }
}
