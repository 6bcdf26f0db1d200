//! Cooperative shutdown signalling.
//!
//! Every streamed component owns a [`ShutdownSignal`]: `close()` primes
//! shutdown without blocking, run loops observe `closing()`, and the loop
//! calls `complete()` once resources are released so that
//! `wait_for_close` observers unblock.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use sluice_message::Error;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod tests;

/// Two-phase shutdown handle: a close request token and a completion
/// token. Cloning shares both.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    close: CancellationToken,
    done: CancellationToken,
}

impl ShutdownSignal {
    /// A fresh signal with neither phase triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent and non-blocking.
    pub fn close(&self) {
        self.close.cancel();
    }

    /// Whether shutdown has been requested.
    pub fn is_closing(&self) -> bool {
        self.close.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn closing(&self) {
        self.close.cancelled().await;
    }

    /// The close-request token, for run loops that select over it.
    pub fn close_token(&self) -> &CancellationToken {
        &self.close
    }

    /// Mark shutdown as complete: all resources have been released.
    pub fn complete(&self) {
        // Completion implies the close request, so late observers of
        // either phase unblock.
        self.close.cancel();
        self.done.cancel();
    }

    /// Whether shutdown has completed.
    pub fn is_complete(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Wait for shutdown to complete, failing with [`Error::Timeout`] if
    /// the component has not released its resources within `timeout`.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        tokio::time::timeout(timeout, self.done.cancelled())
            .await
            .map_err(|_| Error::Timeout)
    }
}
