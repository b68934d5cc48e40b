//! Meter names, readings and batches.

use crate::id::SubscriptionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meters emitted by the demo application: nodes, cpu, data, messages, objects.
pub const DEFAULT_METER_CATALOG: [&str; 5] = ["nde", "cpu", "dta", "msg", "obj"];

/// Application-internal meter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeterName(String);

impl MeterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The default catalog as owned names.
    pub fn default_catalog() -> Vec<MeterName> {
        DEFAULT_METER_CATALOG.iter().map(|n| MeterName::new(*n)).collect()
    }
}

impl fmt::Display for MeterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MeterName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single usage reading. Quantities are passed through unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterValue {
    pub name: MeterName,
    pub quantity: f64,
}

impl MeterValue {
    pub fn new(name: impl Into<MeterName>, quantity: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

impl From<String> for MeterName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Readings for one subscription at one submission instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterBatch {
    pub subscription_id: SubscriptionId,
    pub created_at: DateTime<Utc>,
    pub readings: Vec<MeterValue>,
}

impl MeterBatch {
    pub fn new(subscription_id: SubscriptionId, readings: Vec<MeterValue>) -> Self {
        Self {
            subscription_id,
            created_at: Utc::now(),
            readings,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Names in submission order.
    pub fn meter_names(&self) -> impl Iterator<Item = &MeterName> {
        self.readings.iter().map(|r| &r.name)
    }
}
