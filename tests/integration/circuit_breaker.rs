//! Integration tests for circuit breaker state transitions

use reddit_data_collector::client::{ApiError, BreakerState, CircuitBreaker};
use std::time::Duration;

#[tokio::test]
async fn test_stays_closed_below_threshold() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(60));

    for _ in 0..4 {
        breaker.record_failure();
    }
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert!(breaker.try_acquire().is_ok());
}

#[tokio::test]
async fn test_intervening_success_resets_the_count() {
    let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();
    breaker.record_failure();
    breaker.record_failure();

    // Never three in a row
    assert_eq!(breaker.state(), BreakerState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_open_rejects_until_cooldown_elapses() {
    let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
    breaker.record_failure();
    assert_eq!(breaker.state(), BreakerState::Open);

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(matches!(breaker.try_acquire(), Err(ApiError::CircuitOpen)));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(breaker.try_acquire().is_ok());
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn test_only_one_probe_is_admitted() {
    let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
    breaker.record_failure();
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(breaker.try_acquire().is_ok());
    // Second and third callers during the probe are shed
    assert!(matches!(breaker.try_acquire(), Err(ApiError::CircuitOpen)));
    assert!(matches!(breaker.try_acquire(), Err(ApiError::CircuitOpen)));
}

#[tokio::test(start_paused = true)]
async fn test_probe_outcome_drives_the_next_state() {
    let breaker = CircuitBreaker::new(1, Duration::from_secs(10));

    // Failed probe reopens with a fresh cooldown
    breaker.record_failure();
    tokio::time::sleep(Duration::from_secs(11)).await;
    breaker.try_acquire().unwrap();
    breaker.record_failure();
    assert_eq!(breaker.state(), BreakerState::Open);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(matches!(breaker.try_acquire(), Err(ApiError::CircuitOpen)));

    // Successful probe closes and normal traffic resumes
    tokio::time::sleep(Duration::from_secs(6)).await;
    breaker.try_acquire().unwrap();
    breaker.record_success();
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert!(breaker.try_acquire().is_ok());
    assert!(breaker.try_acquire().is_ok());
}
