//! Integration tests for resilience module
//!
//! Drives the public timeout, retry and circuit breaker API the way call
//! sites do, using scripted flaky operations and Tokio's paused clock.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use devtrack_common::resilience::{
    with_retries, with_timeout, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
    ResilienceError, RetryOptions,
};
use devtrack_common::testing::{FlakyOperation, MockClock, MockFailure};
use devtrack_common::{CommonError, ErrorClassification};
use tokio::time::Instant;

fn retry_options(max_retries: u32, base_ms: u64) -> RetryOptions {
    RetryOptions::builder()
        .max_retries(max_retries)
        .base_delay(Duration::from_millis(base_ms))
        .build()
        .expect("Failed to build retry options")
}

/// Validates recovery from transient failures with exponential backoff.
///
/// # Test Steps
/// 1. Configure 2 retries with a 100ms base delay and multiplier 2
/// 2. Script the operation to fail twice, then succeed
/// 3. Verify the third call's value is returned
/// 4. Confirm 300ms of backoff elapsed on the paused clock (100ms + 200ms)
#[tokio::test(start_paused = true)]
async fn test_retry_recovers_from_transient_failures() {
    let op = FlakyOperation::failing_times(2);
    let start = Instant::now();

    let result = with_retries(|| op.invoke(), &retry_options(2, 100)).await;

    assert_eq!(result.expect("Should succeed on third call"), 3);
    assert_eq!(op.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

/// Validates the retrier gives up after `max_retries + 1` attempts.
///
/// # Test Steps
/// 1. Configure 3 retries against an operation that always fails
/// 2. Verify the operation's own error is surfaced unchanged
/// 3. Confirm exactly 4 attempts were made
#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_surfaces_last_error() {
    let op = FlakyOperation::always_failing().with_message("supabase unavailable");

    let err = with_retries(|| op.invoke(), &retry_options(3, 10))
        .await
        .expect_err("Should exhaust retries");

    assert_eq!(err.to_string(), "supabase unavailable");
    assert_eq!(err.into_operation_error(), Some(MockFailure("supabase unavailable".to_string())));
    assert_eq!(op.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_bounds_hanging_operation() {
    let result: Result<(), ResilienceError<MockFailure>> =
        with_timeout(std::future::pending(), Duration::from_secs(10)).await;

    let err = result.expect_err("Should time out");
    assert!(err.is_timeout());
    assert!(err.is_retryable());
}

/// Validates the circuit opens at the threshold and rejects without invoking.
///
/// # Test Steps
/// 1. Use the default registry (threshold 5, cooldown 30s)
/// 2. Fail five calls under `db-op`
/// 3. Verify the sixth call fails with `CircuitOpen` mentioning `db-op`
/// 4. Confirm the operation ran only 5 times
/// 5. Convert the error into `CommonError::CircuitBreakerOpen`
#[tokio::test]
async fn test_circuit_breaker_opens_and_rejects() {
    let registry = CircuitBreakerRegistry::with_defaults();
    let op = FlakyOperation::always_failing();

    for _ in 0..5 {
        let err = registry
            .with_circuit_breaker("db-op", || op.invoke())
            .await
            .expect_err("Should fail");
        assert_eq!(err.to_string(), "boom");
    }

    let err = registry
        .with_circuit_breaker("db-op", || op.invoke())
        .await
        .expect_err("Should be rejected");

    assert!(err.is_circuit_open());
    assert!(err.to_string().contains("db-op"));
    assert_eq!(op.calls(), 5);

    let status = registry.circuit_breaker_status("db-op").expect("db-op should be tracked");
    assert_eq!(status.state(), CircuitState::Open);

    match CommonError::from(err) {
        CommonError::CircuitBreakerOpen { service, retry_after } => {
            assert_eq!(service, "db-op");
            assert!(retry_after.is_some_and(|d| d <= Duration::from_secs(30)));
        }
        other => panic!("Expected CircuitBreakerOpen, got {other:?}"),
    }
}

/// Validates the full open/cooldown/close cycle with a mock clock.
///
/// # Test Steps
/// 1. Open the breaker with threshold 3
/// 2. Advance the mock clock past the 5s cooldown
/// 3. Verify the next call is attempted and succeeds
/// 4. Confirm the snapshot shows a closed circuit with zero failures
#[tokio::test]
async fn test_circuit_breaker_recovers_after_cooldown() {
    let clock = MockClock::new();
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(3)
        .cooldown(Duration::from_secs(5))
        .build()
        .expect("Failed to build config");
    let registry = CircuitBreakerRegistry::with_clock(config, clock.clone())
        .expect("Failed to build registry");

    let failing = FlakyOperation::always_failing();
    for _ in 0..3 {
        let _ = registry.with_circuit_breaker("upload", || failing.invoke()).await;
    }
    assert!(registry.circuit_breaker_status("upload").expect("tracked").is_open);

    clock.advance(Duration::from_secs(5));

    let healthy = FlakyOperation::succeeding();
    let value = registry
        .with_circuit_breaker("upload", || healthy.invoke())
        .await
        .expect("Should be attempted after cooldown");

    assert_eq!(value, 1);
    let status = registry.circuit_breaker_status("upload").expect("tracked");
    assert_eq!(status.failure_count, 0);
    assert!(!status.is_open);
}

/// Validates the composed wrapper across several exhausted sequences.
///
/// # Test Steps
/// 1. Threshold 2, 1 retry per call
/// 2. Exhaust two retry sequences (4 attempts, 2 breaker failures)
/// 3. Verify the third call is rejected without an attempt
/// 4. Reset the breaker and confirm calls flow again
#[tokio::test(start_paused = true)]
async fn test_retries_and_circuit_breaker_compose() {
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(2)
        .build()
        .expect("Failed to build config");
    let registry = CircuitBreakerRegistry::new(config).expect("Failed to build registry");
    let options = retry_options(1, 10);
    let op = FlakyOperation::always_failing();

    for _ in 0..2 {
        let err = registry
            .with_retries_and_circuit_breaker("load-projects", || op.invoke(), &options)
            .await
            .expect_err("Should exhaust");
        assert!(!err.is_circuit_open());
    }
    assert_eq!(op.calls(), 4);

    let err = registry
        .with_retries_and_circuit_breaker("load-projects", || op.invoke(), &options)
        .await
        .expect_err("Should be rejected");
    assert!(err.is_circuit_open());
    assert_eq!(op.calls(), 4);

    assert!(registry.reset_circuit_breaker("load-projects"));
    assert!(registry.circuit_breaker_status("load-projects").is_none());

    let healthy = FlakyOperation::succeeding();
    registry
        .with_retries_and_circuit_breaker("load-projects", || healthy.invoke(), &options)
        .await
        .expect("Reset breaker should allow calls");
}

/// Validates a registry shared across tasks keeps identifiers isolated.
#[tokio::test(flavor = "multi_thread")]
async fn test_shared_registry_across_tasks() {
    let registry = Arc::new(CircuitBreakerRegistry::with_defaults());

    let handles: Vec<_> = ["auth", "projects", "stats", "auth"]
        .into_iter()
        .map(|id| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let op = FlakyOperation::succeeding();
                registry.with_circuit_breaker(id, || op.invoke()).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked").expect("Call should succeed");
    }

    assert_eq!(registry.tracked_operations(), vec!["auth", "projects", "stats"]);
}
