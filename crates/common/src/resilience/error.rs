//! Error type shared by the timeout, retry and circuit breaker primitives

use std::time::Duration;

use thiserror::Error;

use crate::error::{CommonError, ErrorClassification, ErrorSeverity};

/// Errors that can occur in resilience operations
///
/// Generic over the wrapped operation's error type `E`. The operation's own
/// error is carried unchanged in [`ResilienceError::Operation`]; its
/// `Display` and `source` are forwarded transparently.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// An attempt did not settle within the per-attempt timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The breaker for `operation_id` is open; the operation was not invoked
    #[error("Circuit breaker is open for '{operation_id}', rejecting calls")]
    CircuitOpen { operation_id: String, retry_after: Option<Duration> },

    /// The retry loop ended without capturing a concrete error
    #[error("All retry attempts failed after {attempts} tries")]
    RetriesExhausted { attempts: u32 },

    /// The wrapped operation failed
    #[error(transparent)]
    Operation(E),
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// True if the call was rejected by an open circuit
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// True if the last attempt timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Borrow the operation's own error, if that is what failed
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Consume and return the operation's own error, if that is what failed
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> ErrorClassification for ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::CircuitOpen { .. } => true,
            Self::RetriesExhausted { .. } | Self::Operation(_) => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } | Self::CircuitOpen { .. } => ErrorSeverity::Warning,
            Self::RetriesExhausted { .. } => ErrorSeverity::Critical,
            Self::Operation(_) => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl<E> From<ResilienceError<E>> for CommonError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: ResilienceError<E>) -> Self {
        match err {
            ResilienceError::Timeout { timeout } => CommonError::timeout("attempt", timeout),
            ResilienceError::CircuitOpen { operation_id, retry_after } => {
                CommonError::CircuitBreakerOpen { service: operation_id, retry_after }
            }
            ResilienceError::RetriesExhausted { attempts } => CommonError::internal_with_context(
                format!("all retry attempts failed after {attempts} tries"),
                "retry",
            ),
            ResilienceError::Operation(source) => {
                CommonError::backend("operation", source.to_string(), false)
            }
        }
    }
}
