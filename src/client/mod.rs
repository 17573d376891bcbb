//! Resilient API client layer
//!
//! Composes the three fault-tolerance mechanisms every upstream call passes
//! through:
//!
//! 1. **Circuit Breaker**: rejects calls outright while the upstream is
//!    judged unhealthy ([`breaker::CircuitBreaker`])
//! 2. **Rate Limiting**: sliding-window quota plus mandatory inter-request
//!    spacing ([`rate_limit::RateLimiter`])
//! 3. **Retry**: exponential backoff for transient failures
//!    ([`resilient::ResilientClient`])
//!
//! # Error Handling
//!
//! All call-level failures are expressed as [`ApiError`]. Transient errors
//! are absorbed by the retry loop up to `max_retries`; permanent errors and
//! open-circuit rejections surface immediately. See the module docs on
//! [`resilient`] for the exact ordering contract.

pub mod breaker;
pub mod config;
pub mod rate_limit;
pub mod resilient;

pub use breaker::{BreakerState, CircuitBreaker};
pub use config::{ClientConfig, RetryPolicy};
pub use rate_limit::{Grant, RateLimitError, RateLimiter, RateLimiterConfig};
pub use resilient::ResilientClient;

/// Call-level errors produced by the resilient client and fetchers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Retryable failure: network blip, timeout, 5xx, upstream 429
    #[error("transient error: {0}")]
    Transient(String),

    /// Non-retryable failure: malformed target, not found, auth (4xx except 429)
    #[error("permanent error: {0}")]
    Permanent(String),

    /// Quota window exhausted while the limiter was configured fail-fast
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Circuit breaker is shedding load
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Cancellation was requested while waiting to retry
    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Short stable label for error descriptors and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transient(_) => "transient",
            ApiError::Permanent(_) => "permanent",
            ApiError::RateLimitExceeded => "rate_limit",
            ApiError::CircuitOpen => "circuit_open",
            ApiError::Cancelled => "cancelled",
        }
    }

    /// Whether the retry loop may attempt the call again
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }
}
