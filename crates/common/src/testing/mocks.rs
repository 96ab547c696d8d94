//! Scripted operations for exercising the resilience primitives
//!
//! # Examples
//!
//! ```
//! use devtrack_common::testing::FlakyOperation;
//!
//! # tokio_test::block_on(async {
//! let op = FlakyOperation::failing_times(1);
//! assert!(op.invoke().await.is_err());
//! assert_eq!(op.invoke().await, Ok(2));
//! assert_eq!(op.calls(), 2);
//! # });
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Error returned by [`FlakyOperation`] on a scripted failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MockFailure(pub String);

/// An operation that fails a scripted number of times, then succeeds
///
/// Clones share the call counter, so one clone can be moved into an
/// operation closure while the test keeps the other for assertions.
#[derive(Debug, Clone)]
pub struct FlakyOperation {
    /// `None` fails forever
    failures_before_success: Option<u32>,
    message: String,
    calls: Arc<AtomicU32>,
}

impl FlakyOperation {
    /// Fail the first `failures` calls, succeed afterwards
    pub fn failing_times(failures: u32) -> Self {
        Self::scripted(Some(failures))
    }

    /// Fail every call
    pub fn always_failing() -> Self {
        Self::scripted(None)
    }

    /// Succeed on every call
    pub fn succeeding() -> Self {
        Self::scripted(Some(0))
    }

    fn scripted(failures_before_success: Option<u32>) -> Self {
        Self {
            failures_before_success,
            message: "boom".to_string(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Use `message` as the failure text instead of `"boom"`
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Number of times [`invoke`](Self::invoke) has been called
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Start one call; resolves with the one-based call number on success
    pub fn invoke(&self) -> impl Future<Output = Result<u32, MockFailure>> + Send + 'static {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fails = self.failures_before_success.map_or(true, |failures| call <= failures);
        let message = self.message.clone();

        async move {
            if fails {
                Err(MockFailure(message))
            } else {
                Ok(call)
            }
        }
    }
}
