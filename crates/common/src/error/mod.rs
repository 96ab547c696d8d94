//! Common error types shared across DevTrack crates
//!
//! This module provides the error foundation the resilience primitives and
//! the infrastructure crate build on:
//!
//! 1. **`CommonError`**: error patterns that appear in more than one crate
//!    (configuration, timeouts, open circuits, backend failures)
//!
//! 2. **`ErrorClassification` trait**: a standard interface for classifying
//!    errors by retryability, severity and criticality
//!
//! 3. **`ErrorSeverity` enum**: a unified severity level for logging
//!
//! Module-specific errors should **compose** with `CommonError` rather than
//! duplicating its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum LoaderError {
//!     #[error("Config file not found: {0}")]
//!     Missing(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```
//!
//! | Pattern | CommonError Variant |
//! |---------|---------------------|
//! | **Circuit Breaker** | `CircuitBreakerOpen` |
//! | **Timeouts** | `Timeout` |
//! | **Configuration** | `Config` |
//! | **Serialization** | `Serialization` |
//! | **Backend** | `Backend` |
//! | **Internal** | `Internal` |

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants that appear across multiple crates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String, field: Option<String> },

    /// Circuit breaker is open, preventing operations
    CircuitBreakerOpen { service: String, retry_after: Option<Duration> },

    /// Serialization or deserialization errors
    Serialization { message: String, format: Option<String> },

    /// Timeout errors
    Timeout { operation: String, duration: Duration },

    /// Network or backend connectivity errors
    Backend { service: String, message: String, is_retryable: bool },

    /// Internal errors that shouldn't normally occur
    Internal { message: String, context: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => {
                if let Some(field) = field {
                    write!(f, "Configuration error in field '{}': {}", field, message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::CircuitBreakerOpen { service, retry_after } => {
                if let Some(retry) = retry_after {
                    write!(f, "Circuit breaker open for '{}' (retry in {:?})", service, retry)
                } else {
                    write!(f, "Circuit breaker open for '{}'", service)
                }
            }
            Self::Serialization { message, format } => {
                if let Some(format) = format {
                    write!(f, "Serialization error ({}): {}", format, message)
                } else {
                    write!(f, "Serialization error: {}", message)
                }
            }
            Self::Timeout { operation, duration } => {
                write!(f, "Operation '{}' timed out after {:?}", operation, duration)
            }
            Self::Backend { service, message, .. } => {
                write!(f, "Backend error from '{}': {}", service, message)
            }
            Self::Internal { message, context } => {
                if let Some(ctx) = context {
                    write!(f, "Internal error in '{}': {}", ctx, message)
                } else {
                    write!(f, "Internal error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::CircuitBreakerOpen { .. } | Self::Timeout { .. } => true,
            Self::Backend { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } | Self::Serialization { .. } | Self::Backend { .. } => {
                ErrorSeverity::Error
            }
            Self::CircuitBreakerOpen { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitBreakerOpen { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a circuit breaker error
    pub fn circuit_breaker<S: Into<String>>(service: S) -> Self {
        Self::CircuitBreakerOpen { service: service.into(), retry_after: None }
    }

    /// Create a circuit breaker error with retry timing
    pub fn circuit_breaker_with_retry<S: Into<String>>(service: S, retry_after: Duration) -> Self {
        Self::CircuitBreakerOpen { service: service.into(), retry_after: Some(retry_after) }
    }

    /// Create a serialization error with format information
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Create a backend error
    pub fn backend<S: Into<String>, M: Into<String>>(
        service: S,
        message: M,
        is_retryable: bool,
    ) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    /// Create an internal error with context
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }

    /// Short variant name, used as the `error_type` field in log events
    pub fn error_type_name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::CircuitBreakerOpen { .. } => "circuit_breaker_open",
            Self::Serialization { .. } => "serialization",
            Self::Timeout { .. } => "timeout",
            Self::Backend { .. } => "backend",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Trait for classifying errors by their handling characteristics
///
/// Implemented by every error type in the workspace so callers can make
/// retry and alerting decisions without matching on concrete variants.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are typically transient issues that may succeed if
    /// attempted again, such as timeouts or open circuits.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error handling functionality
    //!
    //! Tests cover constructors, display formatting, severity levels and
    //! retryability.

    use super::*;

    /// Validates `CommonError::config` behavior for the error config simple
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `err.to_string()` equals `"Configuration error: invalid
    ///   configuration"`.
    /// - Ensures `!err.is_retryable()` evaluates to true.
    /// - Confirms `err.severity()` equals `ErrorSeverity::Error`.
    #[test]
    fn test_error_config_simple() {
        let err = CommonError::config("invalid configuration");
        assert_eq!(err.to_string(), "Configuration error: invalid configuration");
        assert!(!err.is_retryable());
        assert!(!err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_config_with_field() {
        let err = CommonError::config_field("cooldown_ms", "must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error in field 'cooldown_ms': must be positive"
        );
    }

    /// Validates `CommonError::circuit_breaker` behavior for the error circuit
    /// breaker open scenario.
    ///
    /// Assertions:
    /// - Confirms `err.to_string()` equals `"Circuit breaker open for
    ///   'load-projects'"`.
    /// - Ensures `err.is_retryable()` evaluates to true.
    /// - Confirms `err.retry_after()` equals `None`.
    #[test]
    fn test_error_circuit_breaker_open() {
        let err = CommonError::circuit_breaker("load-projects");
        assert_eq!(err.to_string(), "Circuit breaker open for 'load-projects'");
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_error_circuit_breaker_with_retry() {
        let err = CommonError::circuit_breaker_with_retry("db-op", Duration::from_secs(30));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert!(err.to_string().contains("retry in 30s"));
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_error_timeout() {
        let err = CommonError::timeout("load-projects", Duration::from_millis(10_000));
        assert_eq!(err.to_string(), "Operation 'load-projects' timed out after 10s");
        assert!(err.is_retryable());
        assert_eq!(err.error_type_name(), "timeout");
    }

    #[test]
    fn test_error_backend_retryability_follows_flag() {
        assert!(CommonError::backend("supabase", "503", true).is_retryable());
        assert!(!CommonError::backend("supabase", "400", false).is_retryable());
    }

    /// Validates `CommonError::internal` behavior for the internal error
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `err.is_critical()` evaluates to true.
    /// - Confirms `err.severity()` equals `ErrorSeverity::Critical`.
    #[test]
    fn test_error_internal_is_critical() {
        let err = CommonError::internal_with_context("all retry attempts failed", "retry");
        assert!(err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.to_string(), "Internal error in 'retry': all retry attempts failed");
    }

    #[test]
    fn test_severity_ordering_and_display() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
