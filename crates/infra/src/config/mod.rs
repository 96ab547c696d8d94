//! Configuration loading and management
//!
//! [`ResilienceSettings`] groups the default retry options, the circuit
//! breaker configuration and the logging setup. Every field has a default,
//! so a config file only needs the keys it changes:
//!
//! ```toml
//! [retry]
//! max_retries = 2
//! base_delay_ms = 100
//!
//! [circuit_breaker]
//! cooldown_ms = 10000
//!
//! [logging]
//! level = "devtrack_common=debug,info"
//! json = true
//! ```

pub mod loader;

use devtrack_common::resilience::{CircuitBreakerConfig, RetryOptions};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_file, probe_config_paths};

use crate::errors::{InfraError, Result};

/// Settings for the resilience layer of one process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    /// Defaults used by calls that do not pass explicit options
    pub retry: RetryOptions,
    /// Shared by every breaker in the registry
    pub circuit_breaker: CircuitBreakerConfig,
    pub logging: LoggingConfig,
}

impl ResilienceSettings {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        self.circuit_breaker.validate()?;
        self.logging.validate()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives in `RUST_LOG` syntax, e.g. `info` or
    /// `devtrack_common=debug,warn`
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl LoggingConfig {
    /// Build the filter for the configured level
    pub fn env_filter(&self) -> Result<EnvFilter> {
        if self.level.trim().is_empty() {
            return Err(InfraError::Config("Log level must not be empty".to_string()));
        }
        EnvFilter::try_new(&self.level)
            .map_err(|e| InfraError::Config(format!("Invalid log level '{}': {}", self.level, e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.env_filter().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ResilienceSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.circuit_breaker.failure_threshold, 5);
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let settings: ResilienceSettings = toml::from_str(
            r#"
[retry]
base_delay_ms = 100

[logging]
json = true
"#,
        )
        .expect("partial settings should parse");

        assert_eq!(settings.retry.base_delay, Duration::from_millis(100));
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.circuit_breaker.cooldown, Duration::from_secs(30));
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "info");
    }

    /// Validates `ResilienceSettings::validate` behavior for the invalid
    /// section scenario.
    ///
    /// Assertions:
    /// - Confirms a zero threshold is reported as a `Common` config error.
    /// - Confirms an unparseable log level is reported as `Config`.
    #[test]
    fn test_validation_reports_each_section() {
        let mut settings = ResilienceSettings::default();
        settings.circuit_breaker.failure_threshold = 0;
        assert!(matches!(settings.validate(), Err(InfraError::Common(_))));

        let mut settings = ResilienceSettings::default();
        settings.logging.level = "devtrack=loud".to_string();
        assert!(matches!(settings.validate(), Err(InfraError::Config(_))));

        settings.logging.level = "  ".to_string();
        assert!(matches!(settings.validate(), Err(InfraError::Config(_))));

        settings.logging.level = "devtrack_common=debug,warn".to_string();
        assert!(settings.validate().is_ok());
    }
}
