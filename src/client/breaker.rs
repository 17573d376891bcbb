//! Circuit breaker for upstream API protection
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream judged unhealthy, calls rejected without being attempted
//! - HalfOpen: one trial call in flight after the cooldown
//!
//! # Transitions
//! ```text
//! Closed   -> Open:     consecutive_failures >= threshold
//! Open     -> HalfOpen: first call attempt after cooldown (admitted as probe)
//! HalfOpen -> Closed:   probe succeeds
//! HalfOpen -> Open:     probe fails (cooldown restarts)
//! ```
//!
//! The breaker never retries on its own; retry belongs to
//! [`crate::client::ResilientClient`]. Callers drive transitions through
//! [`CircuitBreaker::try_acquire`], [`CircuitBreaker::record_success`], and
//! [`CircuitBreaker::record_failure`] and never touch state directly.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::client::config::{BREAKER_COOLDOWN, BREAKER_THRESHOLD};
use crate::client::ApiError;

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through
    Closed,
    /// Calls rejected until the cooldown elapses
    Open,
    /// One trial call admitted, others rejected
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: State,
    consecutive_failures: u32,
}

#[derive(Debug)]
enum State {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

/// Consecutive-failure circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a breaker with the given failure threshold and open-state cooldown.
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Ask permission to make a call.
    ///
    /// Returns `Err(ApiError::CircuitOpen)` while shedding load. An Open
    /// breaker whose cooldown has elapsed transitions to HalfOpen and admits
    /// exactly the one caller that triggered the transition; concurrent
    /// callers during the probe are rejected.
    pub fn try_acquire(&self) -> Result<(), ApiError> {
        let mut inner = self.lock();
        match inner.state {
            State::Closed => Ok(()),
            State::Open { opened_at } => {
                if opened_at.elapsed() >= self.cooldown {
                    info!("Circuit breaker moving to HALF_OPEN, admitting trial call");
                    inner.state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(ApiError::CircuitOpen)
                }
            }
            // Trial call already in flight
            State::HalfOpen => Err(ApiError::CircuitOpen),
        }
    }

    /// Record a successful call: closes a HalfOpen breaker and resets the
    /// consecutive-failure count.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, State::HalfOpen) {
            info!("Circuit breaker CLOSED after successful trial call");
            inner.state = State::Closed;
        }
        inner.consecutive_failures = 0;
    }

    /// Record a failed call.
    ///
    /// A HalfOpen probe failure reopens the breaker and restarts the
    /// cooldown. In Closed state the failure counter increments and the
    /// breaker opens when it reaches the threshold.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;

        match inner.state {
            State::HalfOpen => {
                warn!("Circuit breaker trial call failed, reopening");
                inner.state = State::Open {
                    opened_at: Instant::now(),
                };
            }
            State::Closed => {
                if inner.consecutive_failures >= self.threshold {
                    error!(
                        failures = inner.consecutive_failures,
                        "Circuit breaker OPEN after consecutive failures"
                    );
                    inner.state = State::Open {
                        opened_at: Instant::now(),
                    };
                }
            }
            // Failures reported while Open (e.g. from calls admitted just
            // before the transition) keep the breaker open.
            State::Open { .. } => {}
        }
    }

    /// Current observable state.
    pub fn state(&self) -> BreakerState {
        match self.lock().state {
            State::Closed => BreakerState::Closed,
            State::Open { .. } => BreakerState::Open,
            State::HalfOpen => BreakerState::HalfOpen,
        }
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock is only held for field updates; poisoning would mean a panic
        // mid-update, at which point aborting is the sane option.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BREAKER_THRESHOLD, BREAKER_COOLDOWN)
    }
}
