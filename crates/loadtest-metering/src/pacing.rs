//! Pauses between submissions.

use crate::error::{LoadgenError, Result};
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay inserted after each submission.
///
/// Randomized pauses stagger tenants so the downstream sees organic,
/// unsynchronized traffic rather than bursts.
#[derive(Debug, Clone, PartialEq)]
pub enum Pacing {
    /// Uniform over `[min, max)`.
    Uniform { min: Duration, max: Duration },
    Fixed { delay: Duration },
}

impl Pacing {
    /// Uniform between zero and `max`.
    pub fn up_to(max: Duration) -> Self {
        Pacing::Uniform {
            min: Duration::ZERO,
            max,
        }
    }

    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Pacing::Uniform { min, max } if max > min => {
                let span = (max - min).as_secs_f64();
                min + Duration::from_secs_f64(rng.random::<f64>() * span)
            }
            Pacing::Uniform { min, .. } => min,
            Pacing::Fixed { delay } => delay,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::up_to(Duration::from_secs(10))
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LoadgenError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
