//! Metering domain types for the metering-loadgen load generator.
//!
//! This crate holds the value types that flow from configuration files
//! through the emission loop and onto the wire:
//!
//! ```text
//! subscriptions.json ──► SubscriptionRef ──┐
//!                                          ├──► MeterBatch ──┐
//! meter catalog ───────► MeterName ────────┘                 ├──► MeteringEvent (JSON)
//! plan.json + mapping.json ──► SubscriptionCreationInformation ┘
//! ```
//!
//! # Modules
//!
//! - [`id`] - Deterministic subscription identifiers derived from names
//! - [`meter`] - Meter names, readings and batches
//! - [`subscription`] - Subscription references and creation records
//! - [`event`] - Wire envelope published to the ingestion topic
//! - [`config`] - JSON configuration loading
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod meter;
pub mod subscription;
pub mod timestamp;

pub use config::load_json;
pub use error::{ConfigError, Result};
pub use event::MeteringEvent;
pub use id::{derive_id, SubscriptionId};
pub use meter::{MeterBatch, MeterName, MeterValue, DEFAULT_METER_CATALOG};
pub use subscription::{
    InternalMetersMapping, InternalResourceId, Plan, RenewalInterval, Subscription,
    SubscriptionCreationInformation, SubscriptionEntry, SubscriptionRef,
};
pub use timestamp::parse_metering_timestamp;
