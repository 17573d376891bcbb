//! Integration tests for sliding-window rate limiting

use reddit_data_collector::client::{RateLimitError, RateLimiter, RateLimiterConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn burst(max_requests: usize, window: Duration) -> RateLimiterConfig {
    RateLimiterConfig::new(max_requests, window).with_base_delay(Duration::ZERO)
}

#[tokio::test(start_paused = true)]
async fn test_quota_burst_is_granted_without_waiting() {
    let limiter = RateLimiter::new(burst(10, Duration::from_secs(60)));

    let started = Instant::now();
    for _ in 0..10 {
        let grant = limiter.acquire().await.unwrap();
        assert!(!grant.window_limited);
    }
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_third_acquire_waits_out_the_window() {
    let limiter = RateLimiter::new(burst(2, Duration::from_secs(10)));

    let started = Instant::now();
    limiter.acquire().await.unwrap();
    limiter.acquire().await.unwrap();

    let grant = limiter.acquire().await.unwrap();
    assert!(grant.window_limited);
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_reports_window_occupancy() {
    let config = burst(3, Duration::from_secs(30)).with_fail_fast(true);
    let limiter = RateLimiter::new(config);

    for _ in 0..3 {
        limiter.acquire().await.unwrap();
    }

    match limiter.acquire().await {
        Err(RateLimitError::Exceeded(in_window)) => assert_eq!(in_window, 3),
        other => panic!("expected Exceeded, got {other:?}"),
    }

    // Capacity returns once the window slides past the oldest grant
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(limiter.acquire().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_acquires_never_exceed_quota() {
    let limiter = Arc::new(RateLimiter::new(burst(5, Duration::from_secs(60))));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let limiter = Arc::clone(&limiter);
        handles.push(tokio::spawn(async move { limiter.acquire().await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(limiter.in_window().await, 5);
    assert_eq!(limiter.remaining().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_base_delay_enforces_steady_cadence() {
    let config =
        RateLimiterConfig::new(600, Duration::from_secs(600)).with_base_delay(Duration::from_secs(1));
    let limiter = RateLimiter::new(config);

    let started = Instant::now();
    for _ in 0..5 {
        limiter.acquire().await.unwrap();
    }
    // Five grants with 1s spacing between consecutive ones
    assert!(started.elapsed() >= Duration::from_secs(4));
}
