//! One-time subscription creation events.

use crate::error::Result;
use metering_producer::MeteringProducer;
use metering_types::{
    load_json, InternalMetersMapping, Plan, SubscriptionCreationInformation, SubscriptionRef,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Where the plan and meter mapping are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationConfig {
    pub plan_path: PathBuf,
    pub mapping_path: PathBuf,
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            plan_path: PathBuf::from("plan.json"),
            mapping_path: PathBuf::from("mapping.json"),
        }
    }
}

impl CreationConfig {
    /// Load the plan and meter mapping.
    pub async fn load(&self) -> Result<(Plan, InternalMetersMapping)> {
        let plan: Plan = load_json(&self.plan_path).await?;
        let mapping: InternalMetersMapping = load_json(&self.mapping_path).await?;
        Ok((plan, mapping))
    }
}

/// Submit one monthly creation record per subscription, in order.
///
/// Configuration is loaded up front, so a missing or malformed file fails
/// the run before anything is sent. Returns the number of records sent.
pub async fn create_subscriptions(
    producer: &dyn MeteringProducer,
    subscriptions: &[SubscriptionRef],
    config: &CreationConfig,
    cancel: &CancellationToken,
) -> Result<u64> {
    let (plan, mapping) = config.load().await?;

    let mut created = 0u64;
    for subscription in subscriptions {
        let info =
            SubscriptionCreationInformation::monthly(subscription, plan.clone(), mapping.clone());

        info!(
            "Creating subscription {}:\n{}",
            subscription.id,
            serde_json::to_string_pretty(&info)?
        );
        producer.submit_subscription_creation(&info, cancel).await?;
        created += 1;
    }

    info!("Submitted {created} subscription creation events");
    Ok(created)
}
