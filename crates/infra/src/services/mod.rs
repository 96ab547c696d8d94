//! Service layer

pub mod resilience;

pub use resilience::ResilienceService;
