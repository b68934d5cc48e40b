//! CLI argument definitions for the metering load generator.

use crate::consume::{ConsumeConfig, DEFAULT_INCLUDED_QUANTITY};
use crate::duration::parse_duration;
use crate::interactive::{Console, InteractiveConfig};
use crate::lifecycle::CreationConfig;
use crate::pacing::Pacing;
use crate::quantity::QuantityGenerator;
use crate::scheduler::{FailurePolicy, SchedulerConfig, DEFAULT_PROGRESS_EVERY};
use clap::Args;
use metering_producer::{KafkaConfig, SaslPlain};
use metering_types::MeterName;
use std::path::PathBuf;
use std::time::Duration;

/// Kafka connection arguments.
#[derive(Args, Clone, Debug)]
pub struct KafkaArgs {
    /// Kafka brokers (comma-separated, e.g., "localhost:9092")
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    pub kafka_brokers: String,

    /// Topic receiving metering events
    #[arg(long, env = "METERING_TOPIC", default_value = "metering-events")]
    pub topic: String,

    /// SASL/PLAIN username ("$ConnectionString" for Event Hubs)
    #[arg(long, env = "KAFKA_SASL_USERNAME", requires = "sasl_password")]
    pub sasl_username: Option<String>,

    /// SASL/PLAIN password
    #[arg(
        long,
        env = "KAFKA_SASL_PASSWORD",
        hide_env_values = true,
        requires = "sasl_username"
    )]
    pub sasl_password: Option<String>,

    /// Delivery timeout per message (e.g., "30s")
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub message_timeout: Duration,

    /// Create the topic before producing
    #[arg(long)]
    pub create_topic: bool,

    /// Partitions for a newly created topic
    #[arg(long, default_value = "3")]
    pub partitions: i32,
}

impl KafkaArgs {
    pub fn to_config(&self) -> KafkaConfig {
        let mut config = KafkaConfig::new(&self.kafka_brokers, &self.topic);
        config.message_timeout = self.message_timeout;
        if let (Some(username), Some(password)) = (&self.sasl_username, &self.sasl_password) {
            config = config.with_sasl(SaslPlain {
                username: username.clone(),
                password: password.clone(),
            });
        }
        config
    }
}

/// Arguments shared by every mode.
#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    /// JSON file with subscriptions: [{"id" or "name", "established"}]
    #[arg(long)]
    pub subscriptions: Option<PathBuf>,

    /// Add a subscription by name; its id is derived from the name (repeatable)
    #[arg(long = "subscription-name", value_name = "NAME")]
    pub subscription_names: Vec<String>,

    /// Dry-run mode: log events instead of sending them to Kafka
    #[arg(long)]
    pub dry_run: bool,

    /// Stop the run after this long (e.g., "30m")
    #[arg(long, value_parser = parse_duration)]
    pub run_for: Option<Duration>,
}

/// Meter catalog.
#[derive(Args, Clone, Debug)]
pub struct CatalogArgs {
    /// Meter names, in submission order (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "nde,cpu,dta,msg,obj")]
    pub meters: Vec<String>,
}

impl CatalogArgs {
    pub fn catalog(&self) -> Vec<MeterName> {
        self.meters.iter().map(|m| MeterName::new(m.trim())).collect()
    }
}

/// Inputs for subscription creation records.
#[derive(Args, Clone, Debug)]
pub struct CreationArgs {
    /// Plan JSON file
    #[arg(long, default_value = "plan.json")]
    pub plan: PathBuf,

    /// Internal meters mapping JSON file
    #[arg(long, default_value = "mapping.json")]
    pub mapping: PathBuf,
}

impl CreationArgs {
    pub fn to_config(&self) -> CreationConfig {
        CreationConfig {
            plan_path: self.plan.clone(),
            mapping_path: self.mapping.clone(),
        }
    }
}

/// Continuous emission arguments.
#[derive(Args, Clone, Debug)]
pub struct EmitArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Lower bound for random quantities
    #[arg(long, default_value = "0")]
    pub min_quantity: f64,

    /// Upper bound (exclusive) for random quantities
    #[arg(long, default_value = "1")]
    pub max_quantity: f64,

    /// Send this quantity for every reading instead of random values
    #[arg(long, conflicts_with_all = ["min_quantity", "max_quantity"])]
    pub fixed_quantity: Option<f64>,

    /// Shortest random pause after a submission
    #[arg(long, default_value = "0s", value_parser = parse_duration)]
    pub min_pause: Duration,

    /// Longest random pause after a submission
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub max_pause: Duration,

    /// Pause exactly this long after every submission
    #[arg(long, value_parser = parse_duration, conflicts_with_all = ["min_pause", "max_pause"])]
    pub fixed_pause: Option<Duration>,

    /// Stop after this many passes over all subscriptions (default: run until stopped)
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Attempts per batch before the run stops; 1 fails on the first error
    #[arg(long, default_value = "1")]
    pub attempts: u32,

    /// Wait between attempts
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub retry_backoff: Duration,

    /// Log progress every N submissions (0 disables)
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    pub progress_every: u64,

    /// Random seed for reproducible quantities and pauses
    #[arg(long)]
    pub seed: Option<u64>,
}

impl EmitArgs {
    pub fn to_config(&self) -> SchedulerConfig {
        let quantity = match self.fixed_quantity {
            Some(value) => QuantityGenerator::Fixed { value },
            None => QuantityGenerator::Uniform {
                min: self.min_quantity,
                max: self.max_quantity,
            },
        };
        let pacing = match self.fixed_pause {
            Some(delay) => Pacing::Fixed { delay },
            None => Pacing::Uniform {
                min: self.min_pause,
                max: self.max_pause,
            },
        };
        let failure_policy = if self.attempts > 1 {
            FailurePolicy::Retry {
                max_attempts: self.attempts,
                backoff: self.retry_backoff,
            }
        } else {
            FailurePolicy::FailFast
        };

        SchedulerConfig {
            catalog: self.catalog.catalog(),
            quantity,
            pacing,
            failure_policy,
            max_cycles: self.cycles,
            progress_every: self.progress_every,
            seed: self.seed,
        }
    }
}

/// Included-quantity burst arguments.
#[derive(Args, Clone, Debug)]
pub struct ConsumeArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Quantity submitted for every meter
    #[arg(long, default_value_t = DEFAULT_INCLUDED_QUANTITY)]
    pub quantity: f64,
}

impl ConsumeArgs {
    pub fn to_config(&self) -> ConsumeConfig {
        ConsumeConfig {
            catalog: self.catalog.catalog(),
            quantity: self.quantity,
        }
    }
}

/// Interactive console arguments.
#[derive(Args, Clone, Debug)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub creation: CreationArgs,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Prompt shown before each command
    #[arg(long)]
    pub prompt: Option<String>,
}

impl InteractiveArgs {
    pub fn to_config(&self, title: &str) -> InteractiveConfig {
        let mut console = Console {
            title: title.to_string(),
            ..Console::default()
        };
        if let Some(prompt) = &self.prompt {
            console.prompt = prompt.clone();
        }
        InteractiveConfig {
            console,
            creation: self.creation.to_config(),
            catalog: self.catalog.catalog(),
        }
    }
}
