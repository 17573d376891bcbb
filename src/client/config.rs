//! Client configuration and backoff calculation

use std::time::Duration;

/// Maximum number of retries for transient failures.
/// 5 retries with exponential backoff allows recovery from short outages
/// while avoiding unbounded loops on persistent failures.
pub const MAX_RETRIES: u32 = 5;

/// Sliding-window request quota imposed by the Reddit API (600 per 10 minutes
/// for OAuth clients).
pub const MAX_REQUESTS_PER_WINDOW: usize = 600;

/// Duration of the sliding quota window.
pub const WINDOW_DURATION: Duration = Duration::from_secs(600);

/// Minimum spacing between consecutive requests. The window quota alone would
/// permit bursts; a steady ~1 req/s cadence avoids soft-bans.
pub const BASE_DELAY: Duration = Duration::from_secs(1);

/// Maximum backoff delay for standard collection.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Maximum backoff delay for historical collection, where patience beats
/// giving up on a multi-hour crawl.
pub const MAX_BACKOFF_HISTORICAL: Duration = Duration::from_secs(300);

/// Consecutive failures before the circuit breaker opens.
pub const BREAKER_THRESHOLD: u32 = 5;

/// How long the breaker stays open before admitting a trial call.
pub const BREAKER_COOLDOWN: Duration = Duration::from_secs(60);

/// Retry behavior for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial call
    pub max_retries: u32,
    /// First backoff delay
    pub base_delay: Duration,
    /// Multiplier applied per attempt
    pub backoff_multiplier: f64,
    /// Backoff ceiling
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy tuned for long historical crawls (5-minute backoff ceiling)
    pub fn historical() -> Self {
        Self {
            max_delay: MAX_BACKOFF_HISTORICAL,
            ..Self::default()
        }
    }

    /// Backoff delay for a 0-based attempt number:
    /// `min(base_delay * multiplier^attempt, max_delay)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let delay = self.base_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: BASE_DELAY,
            backoff_multiplier: 2.0,
            max_delay: MAX_BACKOFF,
        }
    }
}

/// Complete configuration for a [`crate::client::ResilientClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum requests within the sliding window
    pub max_requests: usize,
    /// Sliding window duration
    pub window_duration: Duration,
    /// Minimum spacing between consecutive granted requests
    pub base_delay: Duration,
    /// Error instead of blocking when the window is exhausted
    pub fail_fast: bool,
    /// Retry behavior for transient failures
    pub retry: RetryPolicy,
    /// Consecutive failures before the breaker opens
    pub breaker_threshold: u32,
    /// Open-state cooldown before a trial call is admitted
    pub breaker_cooldown: Duration,
}

impl ClientConfig {
    /// Configuration tuned for historical crawls: same quota, more patient
    /// backoff ceiling.
    pub fn historical() -> Self {
        Self {
            retry: RetryPolicy::historical(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_requests: MAX_REQUESTS_PER_WINDOW,
            window_duration: WINDOW_DURATION,
            base_delay: BASE_DELAY,
            fail_fast: false,
            retry: RetryPolicy::default(),
            breaker_threshold: BREAKER_THRESHOLD,
            breaker_cooldown: BREAKER_COOLDOWN,
        }
    }
}
