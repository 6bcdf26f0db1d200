//! The streamed input handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sluice_component::ShutdownSignal;
use sluice_message::{Error, Transaction};

/// Shared control surface of a running input.
#[derive(Debug, Clone)]
pub struct InputHandle {
    connected: Arc<AtomicBool>,
    shutdown: ShutdownSignal,
}

impl InputHandle {
    /// A handle reporting `connected` immediately, with a fresh shutdown
    /// signal.
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Last known liveness of the underlying connection.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Record a liveness change.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Prime shutdown without blocking. Idempotent.
    pub fn close_async(&self) {
        self.shutdown.close();
    }

    /// Wait for the input to release its resources, failing with
    /// [`Error::Timeout`] on overrun.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_for_close(timeout).await
    }

    /// The underlying two-phase shutdown signal, for run loops.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

/// A running input: the single read-only transaction channel plus its
/// control handle.
#[derive(Debug)]
pub struct Input {
    rx: mpsc::Receiver<Transaction>,
    handle: InputHandle,
}

impl Input {
    /// Pair a transaction receiver with a control handle.
    pub fn new(rx: mpsc::Receiver<Transaction>, handle: InputHandle) -> Self {
        Self { rx, handle }
    }

    /// An input fed directly by an in-process channel. Used by tests and
    /// the pipe registry; always reports connected, and completes its
    /// shutdown as soon as it is requested.
    pub fn from_channel(rx: mpsc::Receiver<Transaction>) -> Self {
        let handle = InputHandle::new(true);
        let signal = handle.shutdown().clone();
        tokio::spawn(async move {
            signal.closing().await;
            signal.complete();
        });
        Self { rx, handle }
    }

    /// Receive the next transaction. `None` once the producing side has
    /// shut down.
    pub async fn recv(&mut self) -> Option<Transaction> {
        self.rx.recv().await
    }

    /// Last known liveness.
    pub fn connected(&self) -> bool {
        self.handle.connected()
    }

    /// A clone of the control handle.
    pub fn handle(&self) -> InputHandle {
        self.handle.clone()
    }

    /// Prime shutdown without blocking.
    pub fn close_async(&self) {
        self.handle.close_async();
    }

    /// Wait for resources to be released.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.handle.wait_for_close(timeout).await
    }

    /// Split into the raw transaction channel and the control handle.
    pub fn into_parts(self) -> (mpsc::Receiver<Transaction>, InputHandle) {
        (self.rx, self.handle)
    }
}
