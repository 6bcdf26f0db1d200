//! Sleep - cancellable interpolated pause.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sluice_message::{Batch, Error};

use crate::expr::FieldExpr;
use crate::Processor;

#[cfg(test)]
#[path = "sleep_test.rs"]
mod tests;

/// Pauses for an interpolated duration per batch.
///
/// The pause observes the shutdown token: once it fires, processing
/// returns immediately with no emitted batch. A batch whose first part
/// carries an already-cancelled context skips the pause and passes
/// through unchanged.
pub struct Sleep {
    duration: FieldExpr,
    shutdown: CancellationToken,
}

impl Sleep {
    /// A sleep evaluating `duration` (a humantime string, e.g. `"250ms"`)
    /// against each batch.
    pub fn new(duration: FieldExpr, shutdown: CancellationToken) -> Self {
        Self { duration, shutdown }
    }

    /// The token that cancels in-flight pauses.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

#[async_trait]
impl Processor for Sleep {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        if batch
            .get(0)
            .is_some_and(|p| p.context().is_cancelled())
        {
            return Ok(vec![batch]);
        }

        let rendered = (self.duration)(&batch, 0);
        let period = match humantime::parse_duration(rendered.trim()) {
            Ok(period) => period,
            Err(err) => {
                tracing::error!(input = %rendered, error = %err, "failed to parse sleep duration");
                return Ok(vec![batch]);
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(period) => Ok(vec![batch]),
            _ = self.shutdown.cancelled() => Ok(Vec::new()),
        }
    }

    fn close(&mut self) {
        self.shutdown.cancel();
    }
}
