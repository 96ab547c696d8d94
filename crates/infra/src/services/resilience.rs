//! Shared resilience service.
//!
//! One [`ResilienceService`] is built per process from
//! [`ResilienceSettings`] and handed to every component that talks to a
//! remote dependency. Clones share the same circuit breaker registry, so a
//! breaker opened by one component rejects calls from all of them.
//!
//! # Example
//!
//! ```no_run
//! use devtrack_infra::config;
//! use devtrack_infra::services::ResilienceService;
//!
//! # async fn fetch_projects() -> Result<Vec<String>, std::io::Error> { Ok(Vec::new()) }
//! # async fn example() -> devtrack_infra::Result<()> {
//! let settings = config::load()?;
//! let service = ResilienceService::from_settings(&settings)?;
//!
//! match service.call("load-projects", || fetch_projects()).await {
//!     Ok(projects) => println!("{} projects", projects.len()),
//!     Err(err) if err.is_circuit_open() => println!("backend unavailable, try later"),
//!     Err(err) => println!("failed: {err}"),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use devtrack_common::resilience::{
    with_retries, CircuitBreakerRegistry, CircuitBreakerState, Clock, ResilienceResult,
    RetryOptions, SystemClock,
};

use crate::config::ResilienceSettings;
use crate::errors::Result;

/// Circuit breaker registry plus default retry options
pub struct ResilienceService<C: Clock = SystemClock> {
    registry: Arc<CircuitBreakerRegistry<C>>,
    retry: RetryOptions,
}

impl<C: Clock> Clone for ResilienceService<C> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry), retry: self.retry.clone() }
    }
}

impl<C: Clock> fmt::Debug for ResilienceService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilienceService")
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ResilienceService<SystemClock> {
    /// Build the service from validated settings
    pub fn from_settings(settings: &ResilienceSettings) -> Result<Self> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> ResilienceService<C> {
    /// Build the service with a custom clock (useful for testing)
    pub fn with_clock(settings: &ResilienceSettings, clock: C) -> Result<Self> {
        settings.validate()?;
        let registry = CircuitBreakerRegistry::with_clock(settings.circuit_breaker.clone(), clock)?;
        Ok(Self { registry: Arc::new(registry), retry: settings.retry.clone() })
    }

    /// Registry shared by every clone of this service
    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry<C>> {
        &self.registry
    }

    /// Options used by [`call`](Self::call) and [`retry`](Self::retry)
    pub fn retry_options(&self) -> &RetryOptions {
        &self.retry
    }

    /// Retries with the default options, guarded by the breaker for
    /// `operation_id`
    pub async fn call<F, Fut, T, E>(&self, operation_id: &str, operation: F) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.registry.with_retries_and_circuit_breaker(operation_id, operation, &self.retry).await
    }

    /// Like [`call`](Self::call) with explicit retry options
    pub async fn call_with<F, Fut, T, E>(
        &self,
        operation_id: &str,
        operation: F,
        options: &RetryOptions,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.registry.with_retries_and_circuit_breaker(operation_id, operation, options).await
    }

    /// A single attempt guarded by the breaker, no retries and no timeout
    pub async fn call_once<F, Fut, T, E>(
        &self,
        operation_id: &str,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.registry.with_circuit_breaker(operation_id, operation).await
    }

    /// Retries with the default options, no breaker
    pub async fn retry<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        with_retries(operation, &self.retry).await
    }

    /// Snapshot of the breaker for `operation_id`
    pub fn status(&self, operation_id: &str) -> Option<CircuitBreakerState> {
        self.registry.circuit_breaker_status(operation_id)
    }

    /// Close and forget the breaker for `operation_id`
    pub fn reset(&self, operation_id: &str) -> bool {
        self.registry.reset_circuit_breaker(operation_id)
    }
}
