//! Transport for metering events.
//!
//! The load generator talks to the ingestion endpoint only through the
//! [`MeteringProducer`] trait. Two implementations are provided:
//!
//! - [`KafkaMeteringProducer`] publishes JSON-encoded [`MeteringEvent`]s to a
//!   Kafka topic (or any Kafka-protocol endpoint such as an Event Hubs
//!   namespace), keyed by subscription id so that all events of one
//!   subscription land on the same partition.
//! - [`MemoryProducer`] keeps events in memory; used by `--dry-run` and tests.
//!
//! Every operation takes a [`CancellationToken`] and returns
//! [`ProducerError::Cancelled`] as soon as the token fires.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use metering_producer::{KafkaConfig, KafkaMeteringProducer, MeteringProducer};
//! use metering_types::{MeterBatch, MeterValue, SubscriptionId};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), metering_producer::ProducerError> {
//!     let config = KafkaConfig::new("localhost:9092", "metering-events");
//!     let producer = KafkaMeteringProducer::new(config)?;
//!     let token = CancellationToken::new();
//!
//!     let batch = MeterBatch::new(
//!         SubscriptionId::new("fdc778a6-1281-40e4-cade-4a5fc11f5440"),
//!         vec![MeterValue::new("cpu", 0.5)],
//!     );
//!     producer.submit_meters(&batch, &token).await?;
//!     producer.close(&token).await
//! }
//! ```
//!
//! [`MeteringEvent`]: metering_types::MeteringEvent
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod error;
pub mod kafka;
pub mod memory;

use async_trait::async_trait;
use metering_types::{MeterBatch, MeterValue, SubscriptionCreationInformation, SubscriptionId};
use tokio_util::sync::CancellationToken;

pub use error::{ProducerError, Result};
pub use kafka::{KafkaConfig, KafkaMeteringProducer, SaslPlain};
pub use memory::{MemoryProducer, ProducedEvent};

/// Sink for metering events.
///
/// Implementations must be safe for sequential reuse over the whole process
/// lifetime and must honor the cancellation token promptly.
#[async_trait]
pub trait MeteringProducer: Send + Sync {
    /// Submit a single reading for a subscription.
    async fn submit_meter(
        &self,
        subscription_id: &SubscriptionId,
        reading: &MeterValue,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Submit a batch of readings as one event keyed by its subscription.
    async fn submit_meters(&self, batch: &MeterBatch, cancel: &CancellationToken) -> Result<()>;

    /// Announce a new subscription.
    async fn submit_subscription_creation(
        &self,
        info: &SubscriptionCreationInformation,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Flush outstanding events and release the client.
    async fn close(&self, cancel: &CancellationToken) -> Result<()>;
}
