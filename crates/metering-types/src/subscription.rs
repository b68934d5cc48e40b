//! Subscription references and subscription creation records.

use crate::error::ConfigError;
use crate::id::{derive_id, SubscriptionId};
use crate::timestamp::parse_metering_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subscription in the working set of the load generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubscriptionEntry")]
pub struct SubscriptionRef {
    pub id: SubscriptionId,
    #[serde(rename = "established")]
    pub established_at: DateTime<Utc>,
}

impl SubscriptionRef {
    pub fn new(id: impl Into<SubscriptionId>, established_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            established_at,
        }
    }

    /// Build a reference from a name, deriving the identifier.
    pub fn from_name(name: &str, established_at: DateTime<Utc>) -> Self {
        Self {
            id: derive_id(name),
            established_at,
        }
    }

    /// Parse an `(id, established)` pair as written in configuration.
    pub fn parse(id: &str, established: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            id: SubscriptionId::new(id),
            established_at: parse_metering_timestamp(established)?,
        })
    }
}

/// On-disk form of a working-set entry.
///
/// Either `id` or `name` must be present; a `name` alone yields a derived
/// identifier. A missing `established` timestamp means "now".
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub established: Option<String>,
}

impl TryFrom<SubscriptionEntry> for SubscriptionRef {
    type Error = ConfigError;

    fn try_from(entry: SubscriptionEntry) -> Result<Self, Self::Error> {
        let id = match (entry.id, entry.name) {
            (Some(id), _) => SubscriptionId::new(id),
            (None, Some(name)) => derive_id(&name),
            (None, None) => return Err(ConfigError::MissingIdentity),
        };
        let established_at = match entry.established {
            Some(ts) => parse_metering_timestamp(&ts)?,
            None => Utc::now(),
        };
        Ok(Self { id, established_at })
    }
}

/// Billing plan, loaded from `plan.json` and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(pub serde_json::Value);

/// Mapping from application-internal meter names to plan dimensions,
/// loaded from `mapping.json` and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalMetersMapping(pub serde_json::Value);

/// Resource identifier of a subscription inside the metering platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalResourceId(String);

impl InternalResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&SubscriptionId> for InternalResourceId {
    fn from(id: &SubscriptionId) -> Self {
        Self(id.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenewalInterval {
    Monthly,
    Annually,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: Plan,
    pub internal_resource_id: InternalResourceId,
    pub renewal_interval: RenewalInterval,
    pub subscription_start: DateTime<Utc>,
}

/// Everything the aggregator needs to start tracking a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCreationInformation {
    pub internal_meters_mapping: InternalMetersMapping,
    pub subscription: Subscription,
}

impl SubscriptionCreationInformation {
    /// Monthly subscription for `subscription`, starting when it was established.
    pub fn monthly(
        subscription: &SubscriptionRef,
        plan: Plan,
        internal_meters_mapping: InternalMetersMapping,
    ) -> Self {
        Self {
            internal_meters_mapping,
            subscription: Subscription {
                plan,
                internal_resource_id: InternalResourceId::from(&subscription.id),
                renewal_interval: RenewalInterval::Monthly,
                subscription_start: subscription.established_at,
            },
        }
    }

    pub fn resource_id(&self) -> &InternalResourceId {
        &self.subscription.internal_resource_id
    }
}
