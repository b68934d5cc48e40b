//! Wire envelope for events published to the ingestion topic.

use crate::id::SubscriptionId;
use crate::meter::{MeterBatch, MeterValue};
use crate::subscription::SubscriptionCreationInformation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event as it appears on the topic, JSON encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MeteringEvent {
    UsageReported {
        subscription_id: SubscriptionId,
        timestamp: DateTime<Utc>,
        meters: Vec<MeterValue>,
    },
    SubscriptionPurchased(SubscriptionCreationInformation),
}

impl MeteringEvent {
    pub fn usage(batch: &MeterBatch) -> Self {
        MeteringEvent::UsageReported {
            subscription_id: batch.subscription_id.clone(),
            timestamp: batch.created_at,
            meters: batch.readings.clone(),
        }
    }

    /// A usage event carrying a single reading.
    pub fn single_usage(subscription_id: &SubscriptionId, reading: &MeterValue) -> Self {
        MeteringEvent::UsageReported {
            subscription_id: subscription_id.clone(),
            timestamp: Utc::now(),
            meters: vec![reading.clone()],
        }
    }

    pub fn subscription_purchased(info: &SubscriptionCreationInformation) -> Self {
        MeteringEvent::SubscriptionPurchased(info.clone())
    }

    /// Partition key: the subscription the event belongs to.
    pub fn partition_key(&self) -> &str {
        match self {
            MeteringEvent::UsageReported {
                subscription_id, ..
            } => subscription_id.as_str(),
            MeteringEvent::SubscriptionPurchased(info) => info.resource_id().as_str(),
        }
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
