//! Timeout-bounded execution of a single attempt
//!
//! The operation future is raced against a Tokio timer. When the timer wins
//! the operation future is dropped, which cancels it at its next suspension
//! point; work it already handed to another task is not stopped.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::{ResilienceError, ResilienceResult};

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Run `operation`, failing with [`ResilienceError::Timeout`] if it has not
/// settled within `timeout`
///
/// The operation's own error is returned as [`ResilienceError::Operation`].
pub async fn with_timeout<Fut, T, E>(operation: Fut, timeout: Duration) -> ResilienceResult<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result.map_err(ResilienceError::Operation),
        Err(_) => {
            debug!(timeout_ms = timeout.as_millis() as u64, "Operation timed out");
            Err(ResilienceError::Timeout { timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_with_timeout_returns_value() {
        let result = with_timeout(async { Ok::<_, std::io::Error>(7) }, DEFAULT_TIMEOUT).await;
        assert_eq!(result.expect("should resolve"), 7);
    }

    #[tokio::test]
    async fn test_with_timeout_passes_operation_error_through() {
        let result: ResilienceResult<(), std::io::Error> =
            with_timeout(async { Err(std::io::Error::other("boom")) }, DEFAULT_TIMEOUT).await;

        match result {
            Err(ResilienceError::Operation(err)) => assert_eq!(err.to_string(), "boom"),
            other => panic!("Expected operation error, got {other:?}"),
        }
    }

    /// Validates `with_timeout` behavior for the hanging operation scenario.
    ///
    /// Assertions:
    /// - Confirms the error is `Timeout` carrying the configured duration.
    /// - Confirms exactly the timeout elapsed on the paused clock.
    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_fires_on_hanging_operation() {
        let start = tokio::time::Instant::now();
        let result: ResilienceResult<(), std::io::Error> =
            with_timeout(std::future::pending(), Duration::from_millis(250)).await;

        assert!(matches!(result, Err(ResilienceError::Timeout { timeout }) if timeout == Duration::from_millis(250)));
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_drops_pending_operation() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result: ResilienceResult<(), std::io::Error> = with_timeout(
            async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
            Duration::from_secs(1),
        )
        .await;

        assert!(result.is_err());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!finished.load(Ordering::SeqCst), "dropped operation must not complete");
    }
}
