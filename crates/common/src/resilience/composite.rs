//! Circuit breaker around the retrier
//!
//! The breaker is consulted once per call, not once per attempt: an open
//! circuit means no attempt is made, and a retry sequence that exhausts all
//! of its attempts is recorded as a single breaker failure.

use std::future::Future;

use tracing::instrument;

use super::circuit_breaker::CircuitBreakerRegistry;
use super::clock::Clock;
use super::error::ResilienceResult;
use super::retry::{with_retries, RetryOptions};

impl<C: Clock> CircuitBreakerRegistry<C> {
    /// Run `operation` with retries, guarded by the breaker for `operation_id`
    #[instrument(skip(self, operation, options))]
    pub async fn with_retries_and_circuit_breaker<F, Fut, T, E>(
        &self,
        operation_id: &str,
        operation: F,
        options: &RetryOptions,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.guarded(operation_id, || with_retries(operation, options)).await
    }
}
