//! Command-line interface for metering-loadgen
//!
//! # Usage Examples
//!
//! ## Subscription setup
//! ```bash
//! # Emit one creation event per subscription from plan.json / mapping.json
//! metering-loadgen create-subscriptions \
//!   --kafka-brokers localhost:9092 \
//!   --subscriptions subscriptions.json
//! ```
//!
//! ## Usage load
//! ```bash
//! # Random batches for the demo subscriptions, stop after ten minutes
//! metering-loadgen emit --run-for 10m
//!
//! # Fixed 0.1 quantities every 5 seconds to name-derived subscriptions
//! metering-loadgen emit \
//!   --subscription-name tenant-a --subscription-name tenant-b \
//!   --fixed-quantity 0.1 --fixed-pause 5s
//!
//! # Use up the included quantities in one burst
//! metering-loadgen consume-included --quantity 999
//! ```
//!
//! ## Interactive console
//! ```bash
//! metering-loadgen interactive --dry-run
//! ```
//!
//! ## Event Hubs Kafka endpoint
//! ```bash
//! KAFKA_SASL_USERNAME='$ConnectionString' \
//! KAFKA_SASL_PASSWORD='Endpoint=sb://...;SharedAccessKey=...' \
//! metering-loadgen emit --kafka-brokers ns.servicebus.windows.net:9093 --topic metering
//! ```

mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use loadtest_metering::{
    resolve_working_set, run_mode, CommonArgs, ConsumeArgs, CreationArgs, EmitArgs,
    InteractiveArgs, KafkaArgs, LoadgenError, Mode, ModeReport,
};
use logging::mask_connection_password;
use metering_producer::{KafkaMeteringProducer, MemoryProducer, MeteringProducer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metering-loadgen")]
#[command(about = "Synthetic usage-event load for a metering ingestion pipeline")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one subscription-created event per subscription
    CreateSubscriptions {
        #[command(flatten)]
        kafka: KafkaArgs,

        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        creation: CreationArgs,
    },

    /// Submit a fixed quantity for every meter of every subscription, once
    ConsumeIncluded {
        #[command(flatten)]
        kafka: KafkaArgs,

        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        consume: ConsumeArgs,
    },

    /// Emit paced meter batches until interrupted
    Emit {
        #[command(flatten)]
        kafka: KafkaArgs,

        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        emit: EmitArgs,
    },

    /// Read commands from stdin (c <name>, s <name> [qty], q)
    Interactive {
        #[command(flatten)]
        kafka: KafkaArgs,

        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        interactive: InteractiveArgs,
    },
}

impl Commands {
    fn into_parts(self) -> (KafkaArgs, CommonArgs, Mode) {
        match self {
            Commands::CreateSubscriptions {
                kafka,
                common,
                creation,
            } => (kafka, common, Mode::CreateSubscriptions(creation.to_config())),
            Commands::ConsumeIncluded {
                kafka,
                common,
                consume,
            } => (kafka, common, Mode::ConsumeIncluded(consume.to_config())),
            Commands::Emit {
                kafka,
                common,
                emit,
            } => (kafka, common, Mode::ContinuousBatches(emit.to_config())),
            Commands::Interactive {
                kafka,
                common,
                interactive,
            } => {
                let config = interactive.to_config(env!("CARGO_PKG_NAME"));
                (kafka, common, Mode::Interactive(config))
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let (kafka, common, mode) = cli.command.into_parts();

    let subscriptions = if mode.uses_working_set() {
        resolve_working_set(common.subscriptions.as_deref(), &common.subscription_names)
            .await
            .context("Failed to resolve subscriptions")?
    } else {
        Vec::new()
    };

    let token = CancellationToken::new();
    spawn_shutdown_handler(token.clone(), common.run_for);

    let producer = connect_producer(&kafka, common.dry_run).await?;

    let result = run_mode(&mode, producer.as_ref(), &subscriptions, &token).await;
    token.cancel();

    match result {
        Ok(report) => {
            log_report(&report);
            Ok(())
        }
        Err(LoadgenError::Cancelled) => {
            info!("Mode '{}' cancelled, producer closed", mode.name());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Mode '{}' failed", mode.name())),
    }
}

async fn connect_producer(
    kafka: &KafkaArgs,
    dry_run: bool,
) -> anyhow::Result<Box<dyn MeteringProducer>> {
    if dry_run {
        info!("Dry-run mode: events are logged, nothing is sent to Kafka");
        return Ok(Box::new(MemoryProducer::discarding()));
    }

    let config = kafka.to_config();
    info!("Kafka brokers: {}", config.brokers);
    info!("Topic: {}", config.topic);
    if let Some(sasl) = &config.sasl {
        info!(
            "SASL/PLAIN as '{}' with {}",
            sasl.username,
            mask_connection_password(&sasl.password)
        );
    }

    let producer = KafkaMeteringProducer::new(config).context("Failed to create Kafka producer")?;
    if kafka.create_topic {
        producer
            .create_topic_if_not_exists(kafka.partitions)
            .await
            .with_context(|| format!("Failed to create topic '{}'", producer.topic()))?;
    }
    Ok(Box::new(producer))
}

/// Cancel `token` on Ctrl+C or once `run_for` has elapsed.
fn spawn_shutdown_handler(token: CancellationToken, run_for: Option<Duration>) {
    tokio::spawn(async move {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
            info!("Received interrupt signal (Ctrl+C)");
        };
        let deadline = async {
            match run_for {
                Some(duration) => {
                    tokio::time::sleep(duration).await;
                    info!("Run duration of {duration:?} elapsed");
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = token.cancelled() => return,
            _ = interrupt => {}
            _ = deadline => {}
        }
        token.cancel();
    });
}

fn log_report(report: &ModeReport) {
    match report {
        ModeReport::SubscriptionsCreated(count) => {
            info!("Created {count} subscriptions");
        }
        ModeReport::IncludedConsumed(count) => {
            info!("Submitted {count} included-quantity readings");
        }
        ModeReport::Emission(metrics) => {
            info!(
                "Emission finished: {} batches ({} readings) in {} cycles, {:.2} batches/sec",
                metrics.batches_submitted,
                metrics.readings_submitted,
                metrics.cycles_completed,
                metrics.batches_per_second()
            );
        }
        ModeReport::Interactive(summary) => {
            info!(
                "Console closed: {} subscriptions created, {} batches submitted",
                summary.subscriptions_created, summary.batches_submitted
            );
        }
    }
}
