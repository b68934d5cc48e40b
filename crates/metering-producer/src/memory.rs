//! In-memory [`MeteringProducer`] for dry runs and tests.

use crate::error::{ProducerError, Result};
use crate::MeteringProducer;
use async_trait::async_trait;
use metering_types::{
    MeterBatch, MeterValue, MeteringEvent, SubscriptionCreationInformation, SubscriptionId,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// An event accepted by a [`MemoryProducer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProducedEvent {
    pub key: String,
    pub event: MeteringEvent,
}

/// Producer that keeps (or just counts) accepted events.
#[derive(Debug, Default)]
pub struct MemoryProducer {
    retain: bool,
    events: Mutex<Vec<ProducedEvent>>,
    submitted: AtomicU64,
    closed: AtomicUsize,
    failure: Option<(u64, String)>,
}

impl MemoryProducer {
    /// Keeps every accepted event for later inspection.
    pub fn recording() -> Self {
        Self {
            retain: true,
            ..Self::default()
        }
    }

    /// Only logs and counts events; memory stays flat on endless runs.
    pub fn discarding() -> Self {
        Self::default()
    }

    /// Reject the submission with zero-based sequence number `at`.
    pub fn with_failure_at(mut self, at: u64, message: impl Into<String>) -> Self {
        self.failure = Some((at, message.into()));
        self
    }

    /// Events accepted so far (empty for a discarding producer).
    pub fn events(&self) -> Vec<ProducedEvent> {
        self.lock().clone()
    }

    /// Partition keys of accepted events, in submission order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.key.clone()).collect()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProducedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accept(&self, event: MeteringEvent, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProducerError::Cancelled);
        }

        let seq = self.submitted.fetch_add(1, Ordering::SeqCst);
        if let Some((at, message)) = &self.failure {
            if *at == seq {
                return Err(ProducerError::Rejected(message.clone()));
            }
        }

        let key = event.partition_key().to_string();
        if self.retain {
            debug!("Recorded event #{seq} for {key}");
            self.lock().push(ProducedEvent { key, event });
        } else {
            let payload = event.to_json_bytes()?;
            info!(
                "[DRY-RUN] event #{seq} key={key}: {}",
                String::from_utf8_lossy(&payload)
            );
        }
        Ok(())
    }
}

#[async_trait]
impl MeteringProducer for MemoryProducer {
    async fn submit_meter(
        &self,
        subscription_id: &SubscriptionId,
        reading: &MeterValue,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.accept(MeteringEvent::single_usage(subscription_id, reading), cancel)
    }

    async fn submit_meters(&self, batch: &MeterBatch, cancel: &CancellationToken) -> Result<()> {
        self.accept(MeteringEvent::usage(batch), cancel)
    }

    async fn submit_subscription_creation(
        &self,
        info: &SubscriptionCreationInformation,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.accept(MeteringEvent::subscription_purchased(info), cancel)
    }

    async fn close(&self, _cancel: &CancellationToken) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        info!(
            "In-memory producer closed after {} submissions",
            self.submitted()
        );
        Ok(())
    }
}
