//! Sliding-window rate limiting with mandatory inter-request spacing
//!
//! Tracks the timestamps of granted requests within a trailing window. A new
//! slot is granted only when fewer than `max_requests` grants remain inside
//! the window *and* at least `base_delay` has passed since the previous
//! grant. The second constraint converts a burst-capable window quota into a
//! steady external cadence.
//!
//! The evict + count + append sequence runs under one lock so concurrent
//! callers can never jointly observe capacity and exceed the quota.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::client::config::{BASE_DELAY, MAX_REQUESTS_PER_WINDOW, WINDOW_DURATION};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests within the sliding window
    pub max_requests: usize,
    /// Sliding window duration
    pub window: Duration,
    /// Minimum spacing between consecutive grants
    pub base_delay: Duration,
    /// Error instead of suspending when the window is exhausted
    pub fail_fast: bool,
}

impl RateLimiterConfig {
    /// Create a config with the given quota, default spacing, blocking mode.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            base_delay: BASE_DELAY,
            fail_fast: false,
        }
    }

    /// Override the minimum spacing between grants.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Fail with [`RateLimitError::Exceeded`] instead of waiting for capacity.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(MAX_REQUESTS_PER_WINDOW, WINDOW_DURATION)
    }
}

/// Outcome of a granted [`RateLimiter::acquire`] call
#[derive(Debug, Clone, Copy)]
pub struct Grant {
    /// Total time the caller was suspended before the grant
    pub waited: Duration,
    /// Whether any of the wait was caused by window exhaustion (as opposed
    /// to plain inter-request spacing)
    pub window_limited: bool,
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Window quota exhausted while configured fail-fast
    #[error("rate limit exceeded: {0} requests already in window")]
    Exceeded(usize),
}

#[derive(Debug, Default)]
struct WindowState {
    grants: VecDeque<Instant>,
    last_grant: Option<Instant>,
}

/// Sliding-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    /// Create a limiter from a config.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Acquire a request slot.
    ///
    /// Suspends until both the window quota and the inter-request spacing
    /// allow a grant, then records the grant timestamp. In fail-fast mode an
    /// exhausted window returns [`RateLimitError::Exceeded`] instead of
    /// suspending; spacing waits still apply.
    pub async fn acquire(&self) -> Result<Grant, RateLimitError> {
        let started = Instant::now();
        let mut window_limited = false;

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                // Evict grants that fell out of the trailing window
                while let Some(front) = state.grants.front() {
                    if now.duration_since(*front) >= self.config.window {
                        state.grants.pop_front();
                    } else {
                        break;
                    }
                }

                if state.grants.len() >= self.config.max_requests {
                    if self.config.fail_fast {
                        warn!(
                            in_window = state.grants.len(),
                            max_requests = self.config.max_requests,
                            "Rate limit window exhausted (fail-fast)"
                        );
                        return Err(RateLimitError::Exceeded(state.grants.len()));
                    }
                    window_limited = true;
                    // Wait until the oldest grant leaves the window, then
                    // re-evaluate: other waiters may take the freed slot.
                    match state.grants.front() {
                        Some(oldest) => {
                            let wait = self.config.window - now.duration_since(*oldest);
                            debug!(wait_ms = wait.as_millis() as u64, "Rate limit window full, waiting");
                            wait
                        }
                        None => continue,
                    }
                } else {
                    let spacing_wait = state
                        .last_grant
                        .map(|last| (last + self.config.base_delay).saturating_duration_since(now))
                        .unwrap_or(Duration::ZERO);

                    if spacing_wait.is_zero() {
                        let granted_at = Instant::now();
                        state.grants.push_back(granted_at);
                        state.last_grant = Some(granted_at);
                        return Ok(Grant {
                            waited: started.elapsed(),
                            window_limited,
                        });
                    }
                    spacing_wait
                }
            };

            sleep(wait).await;
        }
    }

    /// Number of grants currently inside the trailing window.
    pub async fn in_window(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        while let Some(front) = state.grants.front() {
            if now.duration_since(*front) >= self.config.window {
                state.grants.pop_front();
            } else {
                break;
            }
        }
        state.grants.len()
    }

    /// Remaining capacity in the trailing window.
    pub async fn remaining(&self) -> usize {
        self.config.max_requests.saturating_sub(self.in_window().await)
    }
}
