//! Line-oriented console for ad-hoc submissions.
//!
//! Commands:
//!
//! - `c <name>`: create a subscription for `name`, starting now
//! - `s <name> [quantity]`: submit every meter with `quantity` (default 1)
//! - `q` / `quit`: leave the console
//! - anything else: submit every meter with 1.0 to the last used subscription
//!
//! Subscription ids are derived from the names, so the same name always
//! addresses the same partition.
//!
//! Process stdin goes through [`spawn_line_reader`]: a read blocked on the
//! terminal cannot be cancelled, and a blocked read on the runtime's
//! blocking pool would keep the runtime from shutting down after Ctrl+C.

use crate::batch::build_batch;
use crate::error::{LoadgenError, Result};
use crate::lifecycle::CreationConfig;
use bytes::Bytes;
use chrono::Utc;
use metering_producer::MeteringProducer;
use metering_types::{
    derive_id, MeterName, SubscriptionCreationInformation, SubscriptionId, SubscriptionRef,
};
use thiserror::Error;
use std::io::BufRead;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Console presentation, passed in by whoever starts the console.
#[derive(Debug, Clone, PartialEq)]
pub struct Console {
    pub title: String,
    pub prompt: String,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            title: env!("CARGO_PKG_NAME").to_string(),
            prompt: "c sub or s sub to submit to a particular subscription>  ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    Create { name: String },
    Submit { name: String, quantity: u64 },
    Repeat,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("'{0}' needs a subscription name")]
    MissingName(String),

    #[error("Invalid quantity '{0}': expected a non-negative integer")]
    InvalidQuantity(String),
}

/// Parse one console line.
pub fn parse_command(line: &str) -> std::result::Result<InteractiveCommand, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(InteractiveCommand::Repeat);
    };
    let head = head.to_lowercase();

    if head == "q" || head == "quit" {
        return Ok(InteractiveCommand::Quit);
    }

    if head.starts_with('c') {
        let name = parts.next().ok_or(CommandError::MissingName(head))?;
        return Ok(InteractiveCommand::Create {
            name: name.to_string(),
        });
    }

    if head.starts_with('s') {
        let name = parts
            .next()
            .ok_or_else(|| CommandError::MissingName(head.clone()))?;
        let quantity = match parts.next() {
            Some(raw) => raw
                .parse()
                .map_err(|_| CommandError::InvalidQuantity(raw.to_string()))?,
            None => 1,
        };
        return Ok(InteractiveCommand::Submit {
            name: name.to_string(),
            quantity,
        });
    }

    Ok(InteractiveCommand::Repeat)
}

/// What happened during a console session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractiveSummary {
    pub subscriptions_created: u64,
    pub batches_submitted: u64,
}

/// Everything the console needs besides its IO.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveConfig {
    pub console: Console,
    pub creation: CreationConfig,
    pub catalog: Vec<MeterName>,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            console: Console::default(),
            creation: CreationConfig::default(),
            catalog: MeterName::default_catalog(),
        }
    }
}

/// Read lines from a blocking `reader` on a detached thread.
///
/// The returned reader yields the same bytes. The thread stops at end of
/// input, on a read error, or once the returned reader is dropped and the
/// next line arrives; until then it is never joined, so shutting down the
/// runtime does not wait on it.
pub fn spawn_line_reader<R>(
    reader: R,
) -> StreamReader<ReceiverStream<std::io::Result<Bytes>>, Bytes>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    std::thread::spawn(move || {
        let mut reader = reader;
        loop {
            let mut line = String::new();
            let item = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => Ok(Bytes::from(line)),
                Err(e) => Err(e),
            };
            let failed = item.is_err();
            if tx.blocking_send(item).is_err() || failed {
                break;
            }
        }
        debug!("Console input thread finished");
    });

    StreamReader::new(ReceiverStream::new(rx))
}

/// Run the console until `q`, end of input, or cancellation.
pub async fn run_interactive<R, W>(
    reader: R,
    mut writer: W,
    config: &InteractiveConfig,
    producer: &dyn MeteringProducer,
    cancel: &CancellationToken,
) -> Result<InteractiveSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = InteractiveSummary::default();
    let mut current: Option<(String, SubscriptionId)> = None;
    let mut lines = reader.lines();

    write_line(&mut writer, &config.console.title).await?;

    loop {
        write_line(&mut writer, &config.console.prompt).await?;

        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LoadgenError::Cancelled),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Console input closed");
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                write_line(&mut writer, &e.to_string()).await?;
                continue;
            }
        };

        match command {
            InteractiveCommand::Quit => break,
            InteractiveCommand::Create { name } => {
                let id = derive_id(&name);
                let (plan, mapping) = config.creation.load().await?;
                let subscription = SubscriptionRef::new(id.clone(), Utc::now());
                let info = SubscriptionCreationInformation::monthly(&subscription, plan, mapping);

                write_line(&mut writer, &format!("Creating subscription {name} ({id})")).await?;
                producer.submit_subscription_creation(&info, cancel).await?;
                summary.subscriptions_created += 1;
                current = Some((name, id));
            }
            InteractiveCommand::Submit { name, quantity } => {
                let id = derive_id(&name);
                let batch = build_batch(&id, &config.catalog, |_| quantity as f64);

                write_line(
                    &mut writer,
                    &format!("Emitting to name={name} (partitionKey={id})"),
                )
                .await?;
                producer.submit_meters(&batch, cancel).await?;
                summary.batches_submitted += 1;
                current = Some((name, id));
            }
            InteractiveCommand::Repeat => {
                let Some((name, id)) = &current else {
                    write_line(
                        &mut writer,
                        "No subscription selected yet, use 'c <name>' or 's <name> [quantity]'",
                    )
                    .await?;
                    continue;
                };
                let batch = build_batch(id, &config.catalog, |_| 1.0);

                write_line(
                    &mut writer,
                    &format!("Emitting to name={name} (partitionKey={id})"),
                )
                .await?;
                producer.submit_meters(&batch, cancel).await?;
                summary.batches_submitted += 1;
            }
        }
    }

    Ok(summary)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
