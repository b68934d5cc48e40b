//! Continuous, paced emission of meter batches.
//!
//! The scheduler walks the working set in a fixed order. For every
//! subscription it builds a batch with fresh random quantities, submits it
//! keyed by the subscription id, and then pauses before moving on. Passes
//! repeat until the cancellation token fires (or an optional cycle bound is
//! reached).
//!
//! ```text
//!            start            token observed
//!   Idle ───────────► Running ──────────────► Cancelling ──► Stopped
//!                        │                                      ▲
//!                        └──── transport error / cycle bound ───┘
//! ```
//!
//! Cancellation is cooperative: it is observed before each submission,
//! during the submission itself, and during every pause. It never interrupts
//! batch construction.

use crate::batch::build_batch;
use crate::error::{LoadgenError, Result};
use crate::metrics::EmissionMetrics;
use crate::pacing::{pause, Pacing};
use crate::quantity::QuantityGenerator;
use metering_producer::{MeteringProducer, ProducerError};
use metering_types::{MeterBatch, MeterName, SubscriptionRef};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of submissions between progress log lines.
pub const DEFAULT_PROGRESS_EVERY: u64 = 10;

/// What to do when the transport rejects a batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FailurePolicy {
    /// Stop the run with the transport error.
    #[default]
    FailFast,
    /// Re-submit the same batch up to `max_attempts` times in total, waiting
    /// `backoff` between attempts. The last error stops the run.
    Retry { max_attempts: u32, backoff: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub catalog: Vec<MeterName>,
    pub quantity: QuantityGenerator,
    pub pacing: Pacing,
    pub failure_policy: FailurePolicy,
    /// Stop after this many full passes; `None` runs until cancelled.
    pub max_cycles: Option<u64>,
    /// Log progress every N submissions; 0 disables.
    pub progress_every: u64,
    /// Seed for quantities and pauses; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            catalog: MeterName::default_catalog(),
            quantity: QuantityGenerator::unit(),
            pacing: Pacing::default(),
            failure_policy: FailurePolicy::FailFast,
            max_cycles: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Cancelling,
    Stopped,
}

/// Drives paced batch emission over a working set of subscriptions.
pub struct BatchScheduler {
    config: SchedulerConfig,
    rng: StdRng,
    state: watch::Sender<SchedulerState>,
    metrics: EmissionMetrics,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            rng,
            state: watch::Sender::new(SchedulerState::Idle),
            metrics: EmissionMetrics::default(),
        }
    }

    /// Current state. Outside of [`run`](Self::run) this is `Idle` or `Stopped`.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Follow state transitions while a run is in progress.
    ///
    /// `Cancelling` is immediately followed by `Stopped`, so a slow watcher
    /// may only see the latter.
    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: SchedulerState) {
        let previous = self.state.send_replace(next);
        debug!("Scheduler state: {previous:?} -> {next:?}");
    }

    /// Counters so far; still meaningful after a cancelled or failed run.
    pub fn metrics(&self) -> &EmissionMetrics {
        &self.metrics
    }

    /// Run until cancelled, until the cycle bound is hit, or until a
    /// submission fails for good.
    ///
    /// Cancellation surfaces as [`LoadgenError::Cancelled`]; transport
    /// failures surface as [`LoadgenError::Transport`] carrying the
    /// producer's error unchanged.
    pub async fn run(
        &mut self,
        producer: &dyn MeteringProducer,
        subscriptions: &[SubscriptionRef],
        cancel: &CancellationToken,
    ) -> Result<EmissionMetrics> {
        if subscriptions.is_empty() {
            return Err(LoadgenError::EmptyWorkingSet);
        }

        info!(
            "Emitting {} meters for {} subscriptions (pacing: {:?}, policy: {:?})",
            self.config.catalog.len(),
            subscriptions.len(),
            self.config.pacing,
            self.config.failure_policy
        );

        self.set_state(SchedulerState::Running);
        let started = Instant::now();
        let result = self.run_cycles(producer, subscriptions, cancel).await;
        self.metrics.elapsed = started.elapsed();

        match &result {
            Err(LoadgenError::Cancelled) => {
                self.set_state(SchedulerState::Cancelling);
                info!(
                    "Cancellation observed after {} batches, abandoning current cycle",
                    self.metrics.batches_submitted
                );
            }
            Err(e) => warn!("Emission stopped: {e}"),
            Ok(()) => info!(
                "Emission complete: {} batches in {:?} ({:.2} batches/sec)",
                self.metrics.batches_submitted,
                self.metrics.elapsed,
                self.metrics.batches_per_second()
            ),
        }
        self.set_state(SchedulerState::Stopped);

        result.map(|()| self.metrics.clone())
    }

    async fn run_cycles(
        &mut self,
        producer: &dyn MeteringProducer,
        subscriptions: &[SubscriptionRef],
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            let final_cycle = self
                .config
                .max_cycles
                .is_some_and(|max| self.metrics.cycles_completed + 1 >= max);

            for (index, subscription) in subscriptions.iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(LoadgenError::Cancelled);
                }

                let quantity = &self.config.quantity;
                let rng = &mut self.rng;
                let batch = build_batch(&subscription.id, &self.config.catalog, |_| {
                    quantity.sample(rng)
                });

                self.submit(producer, &batch, cancel).await?;
                self.record_submission(&batch);

                // No pause after the last submission of a bounded run
                if final_cycle && index + 1 == subscriptions.len() {
                    break;
                }

                let delay = self.config.pacing.next_delay(&mut self.rng);
                debug!("Pausing {delay:?} after {}", subscription.id);
                pause(delay, cancel).await?;
            }

            self.metrics.cycles_completed += 1;
            if final_cycle {
                return Ok(());
            }
        }
    }

    async fn submit(
        &mut self,
        producer: &dyn MeteringProducer,
        batch: &MeterBatch,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut attempt: u32 = 1;
        loop {
            let err = match producer.submit_meters(batch, cancel).await {
                Ok(()) => return Ok(()),
                Err(ProducerError::Cancelled) => return Err(LoadgenError::Cancelled),
                Err(e) => e,
            };

            match self.config.failure_policy {
                FailurePolicy::Retry {
                    max_attempts,
                    backoff,
                } if attempt < max_attempts => {
                    warn!(
                        "Submission for {} failed (attempt {attempt}/{max_attempts}): {err}",
                        batch.subscription_id
                    );
                    self.metrics.retries += 1;
                    attempt += 1;
                    pause(backoff, cancel).await?;
                }
                _ => return Err(LoadgenError::Transport(err)),
            }
        }
    }

    fn record_submission(&mut self, batch: &MeterBatch) {
        self.metrics.batches_submitted += 1;
        self.metrics.readings_submitted += batch.len() as u64;

        let every = self.config.progress_every;
        if every > 0 && self.metrics.batches_submitted % every == 0 {
            info!(
                "Progress: {} batches, {} readings, {} cycles",
                self.metrics.batches_submitted,
                self.metrics.readings_submitted,
                self.metrics.cycles_completed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metering_producer::MemoryProducer;
    use metering_types::MeteringEvent;

    fn subs(ids: &[&str]) -> Vec<SubscriptionRef> {
        ids.iter()
            .map(|id| SubscriptionRef::parse(id, "2021-11-04T16:12:26").unwrap())
            .collect()
    }

    fn one_cycle() -> SchedulerConfig {
        SchedulerConfig {
            max_cycles: Some(1),
            seed: Some(42),
            ..SchedulerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_cycle_submits_in_order() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(one_cycle());

        let metrics = scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap();

        assert_eq!(producer.keys(), vec!["A", "B"]);
        assert_eq!(metrics.batches_submitted, 2);
        assert_eq!(metrics.readings_submitted, 10);
        assert_eq!(metrics.cycles_completed, 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quantities_in_unit_range() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig {
            max_cycles: Some(3),
            ..one_cycle()
        });

        scheduler.run(&producer, &subs(&["A"]), &token).await.unwrap();

        let events = producer.events();
        assert_eq!(events.len(), 3);
        for produced in events {
            let MeteringEvent::UsageReported { meters, .. } = produced.event else {
                panic!("Expected usage event");
            };
            assert_eq!(meters.len(), 5);
            assert!(meters.iter().all(|m| (0.0..1.0).contains(&m.quantity)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_working_set() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(one_cycle());

        let err = scheduler.run(&producer, &[], &token).await.unwrap_err();
        assert!(matches!(err, LoadgenError::EmptyWorkingSet));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_token_submits_nothing() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        token.cancel();
        let mut scheduler = BatchScheduler::new(SchedulerConfig::default());

        let err = scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(producer.submitted(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_propagates_error() {
        let producer = MemoryProducer::recording().with_failure_at(1, "partition offline");
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig {
            seed: Some(1),
            ..SchedulerConfig::default()
        });

        let err = scheduler
            .run(&producer, &subs(&["A", "B", "C"]), &token)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LoadgenError::Transport(ProducerError::Rejected(ref m)) if m == "partition offline"
        ));
        // B failed, C never attempted
        assert_eq!(producer.keys(), vec!["A"]);
        assert_eq!(producer.submitted(), 2);
        assert_eq!(scheduler.metrics().batches_submitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_resubmits_same_subscription() {
        let producer = MemoryProducer::recording().with_failure_at(0, "throttled");
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig {
            failure_policy: FailurePolicy::Retry {
                max_attempts: 3,
                backoff: Duration::from_secs(1),
            },
            ..one_cycle()
        });

        let metrics = scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap();

        assert_eq!(producer.keys(), vec!["A", "B"]);
        assert_eq!(metrics.retries, 1);
        assert_eq!(metrics.batches_submitted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_stops_run() {
        let producer = MemoryProducer::recording().with_failure_at(1, "throttled");
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig {
            failure_policy: FailurePolicy::Retry {
                max_attempts: 1,
                backoff: Duration::from_secs(1),
            },
            ..one_cycle()
        });

        let err = scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadgenError::Transport(_)));
        assert_eq!(producer.keys(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run_skips_trailing_pause() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig {
            pacing: Pacing::Fixed {
                delay: Duration::from_secs(3600),
            },
            ..one_cycle()
        });

        let started = tokio::time::Instant::now();
        scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap();

        // One pause between A and B, none after B
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3600));
        assert!(elapsed < Duration::from_secs(7200));
        assert_eq!(producer.keys(), vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run_pauses_between_cycles() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig {
            pacing: Pacing::Fixed {
                delay: Duration::from_secs(60),
            },
            max_cycles: Some(2),
            ..one_cycle()
        });

        let started = tokio::time::Instant::now();
        let metrics = scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(180));
        assert!(elapsed < Duration::from_secs(240));
        assert_eq!(metrics.cycles_completed, 2);
        assert_eq!(producer.keys(), vec!["A", "B", "A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_watcher_sees_running_then_stopped() {
        let producer = MemoryProducer::recording();
        let token = CancellationToken::new();
        let mut scheduler = BatchScheduler::new(SchedulerConfig::default());
        let mut states = scheduler.watch_state();

        let cancel = token.clone();
        let watcher = tokio::spawn(async move {
            states
                .wait_for(|s| *s == SchedulerState::Running)
                .await
                .unwrap();
            cancel.cancel();
            let stopped = states
                .wait_for(|s| *s == SchedulerState::Stopped)
                .await
                .is_ok();
            stopped
        });

        let err = scheduler
            .run(&producer, &subs(&["A", "B"]), &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(watcher.await.unwrap());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
