//! Run modes. Exactly one is selected per process.

use crate::consume::{consume_included, ConsumeConfig};
use crate::error::{LoadgenError, Result};
use crate::interactive::{
    run_interactive, spawn_line_reader, InteractiveConfig, InteractiveSummary,
};
use crate::lifecycle::{create_subscriptions, CreationConfig};
use crate::metrics::EmissionMetrics;
use crate::scheduler::{BatchScheduler, SchedulerConfig};
use metering_producer::MeteringProducer;
use metering_types::SubscriptionRef;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// One creation event per subscription, then exit.
    CreateSubscriptions(CreationConfig),
    /// One burst using up the included quantities, then exit.
    ConsumeIncluded(ConsumeConfig),
    /// Paced random batches until cancelled.
    ContinuousBatches(SchedulerConfig),
    /// Commands read from stdin.
    Interactive(InteractiveConfig),
}

/// Outcome of a completed mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeReport {
    SubscriptionsCreated(u64),
    IncludedConsumed(u64),
    Emission(EmissionMetrics),
    Interactive(InteractiveSummary),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::CreateSubscriptions(_) => "create-subscriptions",
            Mode::ConsumeIncluded(_) => "consume-included",
            Mode::ContinuousBatches(_) => "emit",
            Mode::Interactive(_) => "interactive",
        }
    }

    /// Whether the mode operates on the resolved working set. The console
    /// derives its subscriptions from the names typed in.
    pub fn uses_working_set(&self) -> bool {
        !matches!(self, Mode::Interactive(_))
    }

    pub async fn run(
        &self,
        producer: &dyn MeteringProducer,
        subscriptions: &[SubscriptionRef],
        cancel: &CancellationToken,
    ) -> Result<ModeReport> {
        match self {
            Mode::CreateSubscriptions(config) => {
                create_subscriptions(producer, subscriptions, config, cancel)
                    .await
                    .map(ModeReport::SubscriptionsCreated)
            }
            Mode::ConsumeIncluded(config) => {
                consume_included(producer, subscriptions, config, cancel)
                    .await
                    .map(ModeReport::IncludedConsumed)
            }
            Mode::ContinuousBatches(config) => {
                let mut scheduler = BatchScheduler::new(config.clone());
                scheduler
                    .run(producer, subscriptions, cancel)
                    .await
                    .map(ModeReport::Emission)
            }
            Mode::Interactive(config) => {
                let stdin = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
                let stdout = tokio::io::stdout();
                run_interactive(stdin, stdout, config, producer, cancel)
                    .await
                    .map(ModeReport::Interactive)
            }
        }
    }
}

/// Run `mode`, then close the producer whatever the outcome.
///
/// A close failure after a successful run is reported as a transport error;
/// after a failed or cancelled run it is only logged so the run outcome
/// is preserved.
pub async fn run_mode(
    mode: &Mode,
    producer: &dyn MeteringProducer,
    subscriptions: &[SubscriptionRef],
    cancel: &CancellationToken,
) -> Result<ModeReport> {
    info!("Starting mode '{}'", mode.name());
    let result = mode.run(producer, subscriptions, cancel).await;

    match (result, producer.close(cancel).await) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(close_err)) => Err(LoadgenError::from(close_err)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("Failed to close producer: {close_err}");
            Err(e)
        }
    }
}
