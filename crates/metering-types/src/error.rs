//! Error types for metering-types crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or interpreting configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp '{value}': expected RFC 3339 or YYYY-MM-DDTHH:MM:SS")]
    InvalidTimestamp { value: String },

    #[error("Subscription entry needs either an 'id' or a 'name'")]
    MissingIdentity,
}

/// Result type alias for metering-types operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
