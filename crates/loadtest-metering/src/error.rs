//! Error types for the metering load generator.

use metering_producer::ProducerError;
use metering_types::ConfigError;
use thiserror::Error;

/// Errors that terminate a load generation run.
///
/// `Cancelled` is not a failure: it reports that the run unwound because
/// the cancellation token fired.
#[derive(Error, Debug)]
pub enum LoadgenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(ProducerError),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Console IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No subscriptions to emit for")]
    EmptyWorkingSet,

    #[error("Run cancelled")]
    Cancelled,
}

impl LoadgenError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadgenError::Cancelled)
    }
}

impl From<ProducerError> for LoadgenError {
    fn from(err: ProducerError) -> Self {
        match err {
            ProducerError::Cancelled => LoadgenError::Cancelled,
            other => LoadgenError::Transport(other),
        }
    }
}

/// Result type alias for load generator operations.
pub type Result<T> = std::result::Result<T, LoadgenError>;
