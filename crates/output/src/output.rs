//! The streamed output contract and the writer-backed implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::task::JoinSet;

use sluice_component::{Backoff, ShutdownSignal};
use sluice_message::{AckResult, Error, Transaction};

use crate::Writer;

#[cfg(test)]
#[path = "output_test.rs"]
mod tests;

/// A component that consumes a transaction channel.
///
/// `consume` may be called exactly once; a second call fails with
/// [`Error::AlreadyStarted`].
#[async_trait]
pub trait StreamOutput: Send + Sync {
    /// Begin consuming transactions from `rx`.
    fn consume(&mut self, rx: mpsc::Receiver<Transaction>) -> Result<(), Error>;

    /// Last known liveness of the underlying connection.
    fn connected(&self) -> bool;

    /// Prime shutdown without blocking. Idempotent.
    fn close_async(&self);

    /// Wait for resources to be released, failing with
    /// [`Error::Timeout`] on overrun.
    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error>;
}

#[async_trait]
impl<T: StreamOutput + ?Sized> StreamOutput for Box<T> {
    fn consume(&mut self, rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        (**self).consume(rx)
    }

    fn connected(&self) -> bool {
        (**self).connected()
    }

    fn close_async(&self) {
        (**self).close_async()
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        (**self).wait_for_close(timeout).await
    }
}

/// Wraps a [`Writer`] with the shared consume loop: a `max_in_flight`
/// write window, retry with capped backoff, and exclusive reconnects.
pub struct WriterOutput {
    writer: Option<Box<dyn Writer>>,
    max_in_flight: usize,
    backoff: Backoff,
    connected: Arc<AtomicBool>,
    shutdown: ShutdownSignal,
}

impl WriterOutput {
    /// An output over `writer` with a single write in flight.
    pub fn new(writer: impl Writer + 'static) -> Self {
        Self {
            writer: Some(Box::new(writer)),
            max_in_flight: 1,
            backoff: Backoff::default().with_max_elapsed(Duration::from_secs(30)),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Allow up to `max_in_flight` concurrent writes.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Override the retry policy used for transient write failures.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl StreamOutput for WriterOutput {
    fn consume(&mut self, rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let writer = self.writer.take().ok_or(Error::AlreadyStarted)?;
        tokio::spawn(run_writer(
            writer,
            rx,
            self.max_in_flight,
            self.backoff.clone(),
            Arc::clone(&self.connected),
            self.shutdown.clone(),
        ));
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn close_async(&self) {
        self.shutdown.close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_for_close(timeout).await
    }
}

async fn run_writer(
    mut writer: Box<dyn Writer>,
    mut rx: mpsc::Receiver<Transaction>,
    max_in_flight: usize,
    backoff_template: Backoff,
    connected: Arc<AtomicBool>,
    shutdown: ShutdownSignal,
) {
    // Establish the initial connection, backing off between attempts.
    // The write retry budget does not apply here; connecting retries
    // until it succeeds or shutdown fires.
    let mut backoff = Backoff::default();
    loop {
        if shutdown.is_closing() {
            writer.close().await;
            shutdown.complete();
            return;
        }
        match writer.connect().await {
            Ok(()) => {
                connected.store(true, Ordering::Relaxed);
                break;
            }
            Err(err) => {
                let delay = backoff.next().unwrap_or_default();
                tracing::warn!(error = %err, retry_in = ?delay, "output connection failed");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.closing() => {}
                }
            }
        }
    }

    let writer = Arc::new(RwLock::new(writer));
    let window = Arc::new(Semaphore::new(max_in_flight));
    let mut writes = JoinSet::new();

    loop {
        let txn = tokio::select! {
            txn = rx.recv() => match txn {
                Some(txn) => txn,
                None => break,
            },
            _ = shutdown.closing() => break,
        };

        let permit = tokio::select! {
            permit = Arc::clone(&window).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = shutdown.closing() => {
                txn.ack(Err(Error::Closed));
                break;
            }
        };

        let writer = Arc::clone(&writer);
        let connected = Arc::clone(&connected);
        let backoff = backoff_template.clone();
        let closing = shutdown.clone();
        writes.spawn(async move {
            let (batch, ack) = txn.into_inner();
            let res = write_with_retry(&writer, &batch, backoff, &connected, &closing).await;
            let _ = ack.send(res);
            drop(permit);
        });
    }

    // Drain in-flight writes before releasing the connection.
    while writes.join_next().await.is_some() {}
    // Remaining queued transactions resolve as closed.
    rx.close();
    while let Ok(txn) = rx.try_recv() {
        txn.ack(Err(Error::Closed));
    }

    connected.store(false, Ordering::Relaxed);
    writer.write().await.close().await;
    shutdown.complete();
}

/// Write one batch, retrying transient failures with backoff until
/// success, a non-transient error, shutdown, or an exhausted retry
/// budget.
async fn write_with_retry(
    writer: &RwLock<Box<dyn Writer>>,
    batch: &sluice_message::Batch,
    mut backoff: Backoff,
    connected: &AtomicBool,
    shutdown: &ShutdownSignal,
) -> AckResult {
    loop {
        let res = {
            let guard = writer.read().await;
            guard.write(batch).await
        };
        let err = match res {
            Ok(()) => {
                connected.store(true, Ordering::Relaxed);
                return Ok(());
            }
            Err(err) => err,
        };

        if !err.is_transient() {
            return Err(err);
        }

        if err == Error::NotConnected {
            connected.store(false, Ordering::Relaxed);
            // Reconnect exclusively; another write may already have
            // restored the connection while we waited for the lock.
            let mut guard = writer.write().await;
            if let Err(conn_err) = guard.connect().await {
                tracing::warn!(error = %conn_err, "output reconnect failed");
            } else {
                connected.store(true, Ordering::Relaxed);
            }
        }

        let Some(delay) = backoff.next() else {
            return Err(err);
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.closing() => return Err(Error::Closed),
        }
    }
}
