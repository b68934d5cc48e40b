//! Usage-event load generator for a metering ingestion pipeline.
//!
//! This crate emits meter readings for a working set of subscriptions to a
//! [`MeteringProducer`](metering_producer::MeteringProducer) so that the
//! downstream aggregation service can be exercised end-to-end.
//!
//! # Architecture
//!
//! ```text
//!  subscriptions ──┐
//!                  ▼
//!          ┌───────────────┐  build_batch  ┌──────────────────┐
//!          │ BatchScheduler│──────────────►│ QuantityGenerator│
//!          │               │               └──────────────────┘
//!          │ - pacing      │
//!          │ - policy      │  submit_meters
//!          │ - token       │──────────────► MeteringProducer ──► topic
//!          └───────────────┘
//! ```
//!
//! A process runs exactly one [`Mode`]: creating subscriptions, a single
//! burst consuming the included quantities, continuous paced batches, or an
//! interactive console. All modes share one cancellation token and the
//! producer is closed once the mode returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use loadtest_metering::{run_mode, Mode, SchedulerConfig};
//! use metering_producer::MemoryProducer;
//! use metering_types::SubscriptionRef;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let producer = MemoryProducer::discarding();
//!     let subs = vec![SubscriptionRef::parse("sub-1", "2021-11-04T16:12:26")?];
//!     let token = CancellationToken::new();
//!
//!     let mode = Mode::ContinuousBatches(SchedulerConfig {
//!         max_cycles: Some(3),
//!         ..SchedulerConfig::default()
//!     });
//!     let report = run_mode(&mode, &producer, &subs, &token).await?;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod batch;
pub mod consume;
pub mod duration;
pub mod error;
pub mod interactive;
pub mod lifecycle;
pub mod metrics;
pub mod mode;
pub mod pacing;
pub mod quantity;
pub mod scheduler;
pub mod subscriptions;

// Re-exports for convenience
pub use args::{
    CatalogArgs, CommonArgs, ConsumeArgs, CreationArgs, EmitArgs, InteractiveArgs, KafkaArgs,
};
pub use batch::build_batch;
pub use consume::{consume_included, ConsumeConfig, DEFAULT_INCLUDED_QUANTITY};
pub use duration::parse_duration;
pub use error::{LoadgenError, Result};
pub use interactive::{
    run_interactive, spawn_line_reader, Console, InteractiveConfig, InteractiveSummary,
};
pub use lifecycle::{create_subscriptions, CreationConfig};
pub use metrics::EmissionMetrics;
pub use mode::{run_mode, Mode, ModeReport};
pub use pacing::Pacing;
pub use quantity::QuantityGenerator;
pub use scheduler::{BatchScheduler, FailurePolicy, SchedulerConfig, SchedulerState};
pub use subscriptions::{demo_subscriptions, resolve_working_set};
