//! Single burst that uses up the plans' included quantities.

use crate::error::Result;
use metering_producer::MeteringProducer;
use metering_types::{MeterName, MeterValue, SubscriptionRef};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The demo plans include 1000 monthly units per meter; this leaves one.
pub const DEFAULT_INCLUDED_QUANTITY: f64 = 999.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeConfig {
    pub catalog: Vec<MeterName>,
    pub quantity: f64,
}

impl Default for ConsumeConfig {
    fn default() -> Self {
        Self {
            catalog: MeterName::default_catalog(),
            quantity: DEFAULT_INCLUDED_QUANTITY,
        }
    }
}

/// Submit `quantity` for every meter of every subscription, one reading per
/// event. Returns the number of readings sent.
pub async fn consume_included(
    producer: &dyn MeteringProducer,
    subscriptions: &[SubscriptionRef],
    config: &ConsumeConfig,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut submitted = 0u64;
    for subscription in subscriptions {
        for meter in &config.catalog {
            let reading = MeterValue::new(meter.clone(), config.quantity);
            producer
                .submit_meter(&subscription.id, &reading, cancel)
                .await?;
            submitted += 1;
        }
        info!(
            "Consumed {} x {} for {}",
            config.catalog.len(),
            config.quantity,
            subscription.id
        );
    }
    Ok(submitted)
}
