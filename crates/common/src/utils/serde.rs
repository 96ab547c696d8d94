//! Serialization utilities for common data types
//!
//! Configuration files express every duration as integer milliseconds
//! (`base_delay_ms = 500`), so the option structs route their `Duration`
//! fields through [`duration_millis`].

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Custom serialization module for Duration as milliseconds
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use devtrack_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_millis")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    /// Serde serialization result type
    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds (u64), saturating on overflow
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize milliseconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
