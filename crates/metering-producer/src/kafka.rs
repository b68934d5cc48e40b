//! Kafka-backed [`MeteringProducer`].

use crate::error::{ProducerError, Result};
use crate::MeteringProducer;
use async_trait::async_trait;
use metering_types::{
    MeterBatch, MeterValue, MeteringEvent, SubscriptionCreationInformation, SubscriptionId,
};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// SASL/PLAIN credentials, e.g. for an Event Hubs Kafka endpoint where the
/// username is `$ConnectionString` and the password the connection string.
#[derive(Debug, Clone)]
pub struct SaslPlain {
    pub username: String,
    pub password: String,
}

/// Connection settings for the ingestion topic.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    /// Upper bound for local queueing plus delivery of one message.
    pub message_timeout: Duration,
    /// How long `close` waits for in-flight messages.
    pub flush_timeout: Duration,
    pub sasl: Option<SaslPlain>,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            message_timeout: Duration::from_secs(30),
            flush_timeout: Duration::from_secs(10),
            sasl: None,
        }
    }

    pub fn with_sasl(mut self, sasl: SaslPlain) -> Self {
        self.sasl = Some(sasl);
        self
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.brokers);
        if let Some(sasl) = &self.sasl {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanism", "PLAIN")
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);
        }
        config
    }

    /// Flush timeout for `close`; zero once shutdown is already under way.
    fn close_timeout(&self, cancelled: bool) -> Duration {
        if cancelled {
            Duration::ZERO
        } else {
            self.flush_timeout
        }
    }

    fn producer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            .set("linger.ms", "5");
        config
    }
}

/// Publishes metering events to a Kafka topic as JSON.
pub struct KafkaMeteringProducer {
    producer: FutureProducer,
    config: KafkaConfig,
}

impl KafkaMeteringProducer {
    pub fn new(config: KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = config.producer_config().create()?;
        Ok(Self { producer, config })
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Create the topic if it doesn't exist yet.
    pub async fn create_topic_if_not_exists(&self, partitions: i32) -> Result<()> {
        let admin_client: AdminClient<DefaultClientContext> =
            self.config.client_config().create()?;

        let topic = self.config.topic.as_str();
        let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(1));
        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(10)));

        let results = admin_client.create_topics(&[new_topic], &opts).await?;
        for result in results {
            match result {
                Ok(topic_name) => {
                    info!("Topic '{topic_name}' created successfully");
                }
                Err((topic_name, err)) => {
                    let err_str = err.to_string();
                    if err_str.contains("already exists")
                        || err_str.contains("TopicExistsException")
                    {
                        info!("Topic '{topic_name}' already exists");
                    } else {
                        return Err(ProducerError::Rejected(format!(
                            "Failed to create topic {topic_name}: {err}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    async fn publish(&self, event: &MeteringEvent, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProducerError::Cancelled);
        }

        let payload = event.to_json_bytes()?;
        let key = event.partition_key();
        let record = FutureRecord::to(&self.config.topic)
            .key(key)
            .payload(&payload);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProducerError::Cancelled),
            delivery = self.producer.send(record, self.config.message_timeout) => {
                delivery.map_err(|(err, _)| ProducerError::Kafka(err))?;
                debug!("Published event for partition key {key}");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MeteringProducer for KafkaMeteringProducer {
    async fn submit_meter(
        &self,
        subscription_id: &SubscriptionId,
        reading: &MeterValue,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let event = MeteringEvent::single_usage(subscription_id, reading);
        self.publish(&event, cancel).await
    }

    async fn submit_meters(&self, batch: &MeterBatch, cancel: &CancellationToken) -> Result<()> {
        self.publish(&MeteringEvent::usage(batch), cancel).await
    }

    async fn submit_subscription_creation(
        &self,
        info: &SubscriptionCreationInformation,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.publish(&MeteringEvent::subscription_purchased(info), cancel)
            .await
    }

    /// Flush queued messages.
    ///
    /// A token that is already cancelled gives queued messages no grace
    /// period. If the token fires while the flush is running, this returns
    /// [`ProducerError::Cancelled`] right away and the blocking flush
    /// finishes on its own within `flush_timeout`; librdkafka offers no way
    /// to interrupt it.
    async fn close(&self, cancel: &CancellationToken) -> Result<()> {
        let timeout = self.config.close_timeout(cancel.is_cancelled());

        let producer = self.producer.clone();
        let flush = tokio::task::spawn_blocking(move || producer.flush(timeout));

        tokio::select! {
            biased;
            _ = cancel.cancelled(), if !cancel.is_cancelled() => {
                warn!(
                    "Cancelled while flushing topic '{}'; flush continues for at most {:?}",
                    self.config.topic, timeout
                );
                Err(ProducerError::Cancelled)
            }
            joined = flush => match joined {
                Ok(result) => {
                    result?;
                    info!("Kafka producer for topic '{}' flushed", self.config.topic);
                    Ok(())
                }
                Err(e) => Err(ProducerError::Shutdown(e.to_string())),
            }
        }
    }
}
