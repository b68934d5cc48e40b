//! End-to-end behaviour of the run modes against in-memory producers.

use async_trait::async_trait;
use loadtest_metering::{
    build_batch, run_interactive, run_mode, BatchScheduler, InteractiveConfig, LoadgenError,
    Mode, ModeReport, Pacing, SchedulerConfig, SchedulerState,
};
use metering_producer::{MemoryProducer, MeteringProducer, ProducerError};
use metering_types::{
    derive_id, MeterBatch, MeterName, MeterValue, MeteringEvent, SubscriptionCreationInformation,
    SubscriptionId, SubscriptionRef,
};
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Cancels `token` once `after` submissions have been accepted.
struct CancellingProducer {
    inner: MemoryProducer,
    after: u64,
    token: CancellationToken,
}

impl CancellingProducer {
    fn maybe_cancel(&self) {
        if self.inner.submitted() >= self.after {
            self.token.cancel();
        }
    }
}

#[async_trait]
impl MeteringProducer for CancellingProducer {
    async fn submit_meter(
        &self,
        subscription_id: &SubscriptionId,
        reading: &MeterValue,
        cancel: &CancellationToken,
    ) -> metering_producer::Result<()> {
        let result = self.inner.submit_meter(subscription_id, reading, cancel).await;
        self.maybe_cancel();
        result
    }

    async fn submit_meters(
        &self,
        batch: &MeterBatch,
        cancel: &CancellationToken,
    ) -> metering_producer::Result<()> {
        let result = self.inner.submit_meters(batch, cancel).await;
        self.maybe_cancel();
        result
    }

    async fn submit_subscription_creation(
        &self,
        info: &SubscriptionCreationInformation,
        cancel: &CancellationToken,
    ) -> metering_producer::Result<()> {
        let result = self.inner.submit_subscription_creation(info, cancel).await;
        self.maybe_cancel();
        result
    }

    async fn close(&self, cancel: &CancellationToken) -> metering_producer::Result<()> {
        self.inner.close(cancel).await
    }
}

fn working_set(ids: &[&str]) -> Vec<SubscriptionRef> {
    ids.iter()
        .map(|id| SubscriptionRef::parse(id, "2021-11-04T16:12:26").unwrap())
        .collect()
}

#[test]
fn test_fixed_quantity_batch_covers_catalog() {
    let catalog: Vec<MeterName> = ["nde", "cpu", "dta", "msg", "obj"]
        .into_iter()
        .map(MeterName::from)
        .collect();

    let batch = build_batch(&SubscriptionId::new("sub"), &catalog, |_| 999.0);

    assert_eq!(batch.readings.len(), 5);
    for (reading, name) in batch.readings.iter().zip(&catalog) {
        assert_eq!(&reading.name, name);
        assert_eq!(reading.quantity, 999.0);
    }
}

#[test]
fn test_derived_id_is_stable() {
    // Pinned so separate processes and other tooling agree on the key.
    assert_eq!(
        derive_id("tenant-x").as_str(),
        "ecf6e931-7668-4885-c13d-63835a8c9414"
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_cycle_submits_each_subscription_once_in_order() {
    let producer = MemoryProducer::recording();
    let token = CancellationToken::new();
    let mode = Mode::ContinuousBatches(SchedulerConfig {
        max_cycles: Some(1),
        seed: Some(42),
        ..SchedulerConfig::default()
    });

    let report = run_mode(&mode, &producer, &working_set(&["A", "B"]), &token)
        .await
        .unwrap();

    assert_eq!(producer.keys(), vec!["A", "B"]);
    let ModeReport::Emission(metrics) = report else {
        panic!("Expected emission report");
    };
    assert_eq!(metrics.batches_submitted, 2);
    assert_eq!(producer.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_pause_stops_before_next_submission() {
    let token = CancellationToken::new();
    let producer = CancellingProducer {
        inner: MemoryProducer::recording(),
        after: 1,
        token: token.clone(),
    };
    let mut scheduler = BatchScheduler::new(SchedulerConfig {
        pacing: Pacing::Fixed {
            delay: Duration::from_secs(5),
        },
        seed: Some(3),
        ..SchedulerConfig::default()
    });

    let err = scheduler
        .run(&producer, &working_set(&["A", "B", "C"]), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, LoadgenError::Cancelled));
    assert_eq!(producer.inner.keys(), vec!["A"]);
    assert_eq!(producer.inner.submitted(), 1);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(scheduler.metrics().batches_submitted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_external_cancel_unblocks_long_pause() {
    let token = CancellationToken::new();
    let producer = MemoryProducer::recording();
    let mut scheduler = BatchScheduler::new(SchedulerConfig {
        pacing: Pacing::Fixed {
            delay: Duration::from_secs(3600),
        },
        ..SchedulerConfig::default()
    });

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        canceller.cancel();
    });

    let start = tokio::time::Instant::now();
    let err = scheduler
        .run(&producer, &working_set(&["A", "B"]), &token)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(3600));
    assert_eq!(producer.keys(), vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_ends_run_and_closes_producer() {
    let producer = MemoryProducer::recording().with_failure_at(3, "event hub unavailable");
    let token = CancellationToken::new();
    let mode = Mode::ContinuousBatches(SchedulerConfig::default());

    let err = run_mode(&mode, &producer, &working_set(&["A", "B"]), &token)
        .await
        .unwrap_err();

    match err {
        LoadgenError::Transport(ProducerError::Rejected(message)) => {
            assert_eq!(message, "event hub unavailable");
        }
        other => panic!("Expected transport error, got {other:?}"),
    }
    // Second cycle: A accepted, B rejected
    assert_eq!(producer.keys(), vec!["A", "B", "A"]);
    assert_eq!(producer.close_count(), 1);
}

#[tokio::test]
async fn test_interactive_session() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = InteractiveConfig::default();
    config.creation.plan_path = dir.path().join("plan.json");
    config.creation.mapping_path = dir.path().join("mapping.json");
    std::fs::write(&config.creation.plan_path, r#"{"planId": "demo"}"#).unwrap();
    std::fs::write(&config.creation.mapping_path, r#"{"cpu": "cpu"}"#).unwrap();

    let input = tokio_test::io::Builder::new()
        .read(b"c tenant-x\n")
        .read(b"s tenant-y 7\n")
        .read(b"s\n")
        .read(b"\n")
        .read(b"q\n")
        .build();
    let mut output = Vec::new();
    let producer = MemoryProducer::recording();
    let token = CancellationToken::new();

    let summary = run_interactive(
        BufReader::new(input),
        &mut output,
        &config,
        &producer,
        &token,
    )
    .await
    .unwrap();

    assert_eq!(summary.subscriptions_created, 1);
    assert_eq!(summary.batches_submitted, 2);

    let x = derive_id("tenant-x");
    let y = derive_id("tenant-y");
    assert_eq!(
        producer.keys(),
        vec![x.to_string(), y.to_string(), y.to_string()]
    );

    let events = producer.events();
    let MeteringEvent::UsageReported { meters, .. } = &events[1].event else {
        panic!("Expected usage event");
    };
    assert!(meters.iter().all(|m| m.quantity == 7.0));
    let MeteringEvent::UsageReported { meters, .. } = &events[2].event else {
        panic!("Expected usage event");
    };
    assert!(meters.iter().all(|m| m.quantity == 1.0));

    let transcript = String::from_utf8(output).unwrap();
    assert!(transcript.contains(&format!("Creating subscription tenant-x ({x})")));
    assert!(transcript.contains("needs a subscription name"));
}

#[tokio::test]
async fn test_interactive_repeat_without_selection() {
    let input = tokio_test::io::Builder::new().read(b"\n").build();
    let mut output = Vec::new();
    let producer = MemoryProducer::recording();
    let token = CancellationToken::new();

    let summary = run_interactive(
        BufReader::new(input),
        &mut output,
        &InteractiveConfig::default(),
        &producer,
        &token,
    )
    .await
    .unwrap();

    assert_eq!(summary.batches_submitted, 0);
    assert_eq!(producer.submitted(), 0);
    assert!(String::from_utf8(output)
        .unwrap()
        .contains("No subscription selected"));
}

#[tokio::test]
async fn test_interactive_cancel_while_waiting_for_input() {
    let (_keep_open, reader) = tokio::io::duplex(64);
    let mut output = Vec::new();
    let producer = MemoryProducer::recording();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = run_interactive(
        BufReader::new(reader),
        &mut output,
        &InteractiveConfig::default(),
        &producer,
        &token,
    )
    .await
    .unwrap_err();

    assert!(err.is_cancelled());
}
