//! Integration tests for the resilient client composition

use reddit_data_collector::cancel::CancelToken;
use reddit_data_collector::client::{
    ApiError, BreakerState, ClientConfig, ResilientClient, RetryPolicy,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

fn quick_config(max_retries: u32) -> ClientConfig {
    ClientConfig {
        base_delay: Duration::ZERO,
        retry: RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        },
        ..ClientConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_double_between_attempts() {
    let client = ResilientClient::new(quick_config(3));
    let started = Instant::now();

    let result: Result<(), _> = client
        .execute(|| async { Err(ApiError::Transient("flaky".into())) })
        .await;

    assert!(matches!(result, Err(ApiError::Transient(_))));
    // Sleeps of 1s, 2s, 4s between the four attempts
    assert_eq!(started.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_transient_blip_recovers_without_surfacing() {
    let client = ResilientClient::new(quick_config(5));
    let calls = AtomicU32::new(0);

    let value = client
        .execute(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiError::Transient("503".into()))
                } else {
                    Ok("payload")
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "payload");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let snap = client.metrics_snapshot();
    assert_eq!(snap.requests_made, 1);
    assert_eq!(snap.requests_failed, 1);
    assert_eq!(client.breaker_state(), BreakerState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_exhaustion_opens_the_breaker() {
    // Each exhausted call records exactly one breaker failure
    let client = ResilientClient::new(quick_config(0));

    for _ in 0..5 {
        let result: Result<(), _> = client
            .execute(|| async { Err(ApiError::Transient("down".into())) })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(client.breaker_state(), BreakerState::Open);

    let invoked = AtomicU32::new(0);
    let result: Result<(), _> = client
        .execute(|| {
            invoked.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert!(matches!(result, Err(ApiError::CircuitOpen)));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert_eq!(client.metrics_snapshot().circuit_breaker_trips, 1);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_recovers_through_a_successful_probe() {
    let mut config = quick_config(0);
    config.breaker_threshold = 1;
    config.breaker_cooldown = Duration::from_secs(30);
    let client = ResilientClient::new(config);

    let result: Result<(), _> = client
        .execute(|| async { Err(ApiError::Transient("down".into())) })
        .await;
    assert!(result.is_err());
    assert_eq!(client.breaker_state(), BreakerState::Open);

    tokio::time::sleep(Duration::from_secs(31)).await;

    let value = client.execute(|| async { Ok(42) }).await.unwrap();
    assert_eq!(value, 42);
    assert_eq!(client.breaker_state(), BreakerState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_window_exhaustion_counts_rate_limit_hits() {
    let mut config = quick_config(0);
    config.max_requests = 2;
    config.window_duration = Duration::from_secs(10);
    let client = ResilientClient::new(config);

    for _ in 0..3 {
        client.execute(|| async { Ok(()) }).await.unwrap();
    }

    let snap = client.metrics_snapshot();
    assert_eq!(snap.requests_made, 3);
    assert_eq!(snap.rate_limit_hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_a_long_backoff() {
    let cancel = CancelToken::new();
    let client = ResilientClient::new(quick_config(5)).with_cancel(cancel.clone());

    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        }
    });

    // First backoff is 1s; cancellation lands at 500ms
    let result: Result<(), _> = client
        .execute(|| async { Err(ApiError::Transient("slow outage".into())) })
        .await;

    assert!(matches!(result, Err(ApiError::Cancelled)));
    handle.await.unwrap();
}
