//! Configuration types for the Tessera client.
//!
//! Configuration is loaded from TOML. Config structs validate their values at
//! construction time via fallible builders; post-deserialization validation is
//! available via the `validate()` method.

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// `json_schema!` and `json_internal!` expansions.
#![allow(clippy::disallowed_methods)]

mod cluster;

pub use cluster::*;
use snafu::Snafu;

/// Configuration error.
///
/// Returned when a configuration value is outside its valid range, violates a
/// cross-field constraint, or cannot be parsed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// The configuration document is malformed.
    #[snafu(display("failed to parse config: {source}"))]
    Parse {
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// Duration serialization using humantime format.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Optional duration in humantime format, where `"infinite"` means `None`.
mod humantime_or_infinite {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    const INFINITE: &str = "infinite";

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_str(INFINITE),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case(INFINITE) {
            return Ok(None);
        }
        humantime::parse_duration(&s).map(Some).map_err(serde::de::Error::custom)
    }
}
