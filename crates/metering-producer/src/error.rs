//! Error types for the metering producer.

use thiserror::Error;

/// Errors that can occur while submitting events.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Producer shutdown failed: {0}")]
    Shutdown(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ProducerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProducerError::Cancelled)
    }
}

/// Result type alias for producer operations.
pub type Result<T> = std::result::Result<T, ProducerError>;
