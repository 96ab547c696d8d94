//! Errors raised while wiring the resilience layer into a process.

use std::time::Duration;

use devtrack_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Infrastructure error
#[derive(Debug, Error)]
pub enum InfraError {
    /// Settings could not be read, parsed or overridden
    #[error("Configuration error: {0}")]
    Config(String),

    /// The global subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, InfraError>;

impl ErrorClassification for InfraError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Common(err) => err.is_retryable(),
            Self::Config(_) | Self::Logging(_) => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Common(err) => err.severity(),
            Self::Config(_) => ErrorSeverity::Error,
            Self::Logging(_) => ErrorSeverity::Warning,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Common(err) if err.is_critical())
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Common(err) => err.retry_after(),
            Self::Config(_) | Self::Logging(_) => None,
        }
    }
}
