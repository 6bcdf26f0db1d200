//! Batcher - a batching policy prefixed to a child output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use sluice_batch::Policy;
use sluice_component::ShutdownSignal;
use sluice_message::{Error, Tracked, Transaction};

use crate::StreamOutput;

#[cfg(test)]
#[path = "batcher_test.rs"]
mod tests;

/// Consumes upstream transactions, accumulates their parts into a
/// batching policy, and emits one downstream transaction per flush.
///
/// The flushed batch's single ack result is broadcast across every
/// upstream transaction whose parts contributed to it. During shutdown a
/// pending period trigger is honoured for one final flush before the
/// child output is released.
pub struct Batcher {
    policy: Option<Policy>,
    child: Arc<Mutex<Box<dyn StreamOutput>>>,
    shutdown: ShutdownSignal,
}

impl Batcher {
    /// Prefix `child` with `policy`.
    pub fn new(policy: Policy, child: impl StreamOutput + 'static) -> Self {
        Self {
            policy: Some(policy),
            child: Arc::new(Mutex::new(Box::new(child))),
            shutdown: ShutdownSignal::new(),
        }
    }
}

#[async_trait]
impl StreamOutput for Batcher {
    fn consume(&mut self, rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let policy = self.policy.take().ok_or(Error::AlreadyStarted)?;
        let (child_tx, child_rx) = mpsc::channel(1);
        self.child
            .try_lock()
            .map_err(|_| Error::AlreadyStarted)?
            .consume(child_rx)?;

        tokio::spawn(run_batcher(
            policy,
            rx,
            child_tx,
            Arc::clone(&self.child),
            self.shutdown.clone(),
        ));
        Ok(())
    }

    fn connected(&self) -> bool {
        self.child
            .try_lock()
            .map(|child| child.connected())
            .unwrap_or(false)
    }

    fn close_async(&self) {
        self.shutdown.close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_for_close(timeout).await
    }
}

async fn run_batcher(
    mut policy: Policy,
    mut rx: mpsc::Receiver<Transaction>,
    child_tx: mpsc::Sender<Transaction>,
    child: Arc<Mutex<Box<dyn StreamOutput>>>,
    shutdown: ShutdownSignal,
) {
    let mut pending: Vec<Tracked> = Vec::new();
    let mut upstream_open = true;

    'run: loop {
        let timer = policy.until_next();
        let period_due = async {
            match timer {
                Some(remaining) => tokio::time::sleep(remaining).await,
                None => std::future::pending().await,
            }
        };

        let mut flush_due = false;
        let mut finished = false;

        tokio::select! {
            txn = rx.recv(), if upstream_open => match txn {
                Some(txn) => {
                    let tracked = Tracked::new(txn);
                    for part in tracked.batch().clone() {
                        if policy.add(part) {
                            flush_due = true;
                        }
                    }
                    pending.push(tracked);
                }
                None => {
                    upstream_open = false;
                    finished = true;
                    if policy.count() > 0 {
                        // Honour a pending period trigger before the
                        // final flush.
                        if let Some(remaining) = policy.until_next() {
                            tokio::select! {
                                _ = tokio::time::sleep(remaining) => {}
                                _ = shutdown.closing() => {}
                            }
                        }
                        flush_due = true;
                    }
                }
            },
            _ = period_due => flush_due = true,
            _ = shutdown.closing() => {
                finished = true;
                flush_due = true;
            }
        }

        if flush_due {
            match policy.flush().await {
                Ok(Some(batch)) => {
                    let (txn, ack_rx) = Transaction::new(batch);
                    tokio::select! {
                        sent = child_tx.send(txn) => {
                            if sent.is_err() {
                                break 'run;
                            }
                        }
                        // The final flush is given every chance to land;
                        // anything earlier yields to shutdown.
                        _ = shutdown.closing(), if !finished => break 'run,
                    }
                    let upstream: Vec<Tracked> = std::mem::take(&mut pending);
                    tokio::spawn(async move {
                        let res = match ack_rx.await {
                            Ok(res) => res,
                            Err(_) => Err(Error::Closed),
                        };
                        for mut tracked in upstream {
                            tracked.ack(res.clone());
                        }
                    });
                }
                Ok(None) => {
                    // Everything accumulated was filtered out at flush
                    // time; the contributors were still delivered.
                    for mut tracked in pending.drain(..) {
                        tracked.ack(Ok(()));
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "batch flush processors failed");
                    for mut tracked in pending.drain(..) {
                        tracked.ack(Err(err.clone()));
                    }
                }
            }
        }

        if finished {
            break 'run;
        }
    }

    drop(child_tx);
    policy.close();

    let child = child.lock().await;
    child.close_async();
    if let Err(err) = child.wait_for_close(Duration::from_secs(5)).await {
        tracing::warn!(error = %err, "child output did not close in time");
    }
    shutdown.complete();
}
