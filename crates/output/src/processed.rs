//! Processed - a processor chain prefixed to a child output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use sluice_component::ShutdownSignal;
use sluice_message::{tracker, Error, Transaction};
use sluice_processor::{execute_all, BoxProcessor};

use crate::StreamOutput;

#[cfg(test)]
#[path = "processed_test.rs"]
mod tests;

/// Runs every consumed batch through a processor chain before handing
/// the results to a child output.
///
/// Each emitted batch becomes a derived downstream transaction; the
/// upstream ack resolves once every derived transaction has, first
/// error winning. A batch whose parts are all filtered out is acked
/// success without touching the child.
pub struct Processed {
    chain: Option<Vec<BoxProcessor>>,
    child: Arc<Mutex<Box<dyn StreamOutput>>>,
    shutdown: ShutdownSignal,
}

impl Processed {
    /// Prefix `child` with `chain`.
    pub fn new(chain: Vec<BoxProcessor>, child: impl StreamOutput + 'static) -> Self {
        Self {
            chain: Some(chain),
            child: Arc::new(Mutex::new(Box::new(child))),
            shutdown: ShutdownSignal::new(),
        }
    }
}

#[async_trait]
impl StreamOutput for Processed {
    fn consume(&mut self, rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        let chain = self.chain.take().ok_or(Error::AlreadyStarted)?;
        let (child_tx, child_rx) = mpsc::channel(1);
        self.child
            .try_lock()
            .map_err(|_| Error::AlreadyStarted)?
            .consume(child_rx)?;

        tokio::spawn(run_processed(
            chain,
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

async fn run_processed(
    mut chain: Vec<BoxProcessor>,
    mut rx: mpsc::Receiver<Transaction>,
    child_tx: mpsc::Sender<Transaction>,
    child: Arc<Mutex<Box<dyn StreamOutput>>>,
    shutdown: ShutdownSignal,
) {
    'run: loop {
        let txn = tokio::select! {
            txn = rx.recv() => match txn {
                Some(txn) => txn,
                None => break 'run,
            },
            _ = shutdown.closing() => break 'run,
        };

        let (batch, ack) = txn.into_inner();
        match execute_all(&mut chain, vec![batch]).await {
            Ok(batches) if batches.is_empty() => {
                let _ = ack.send(Ok(()));
            }
            Ok(batches) => {
                for derived in tracker::fan_in(ack, batches) {
                    tokio::select! {
                        sent = child_tx.send(derived) => {
                            if sent.is_err() {
                                break 'run;
                            }
                        }
                        _ = shutdown.closing() => break 'run,
                    }
                }
            }
            Err(Error::Closed) => {
                let _ = ack.send(Err(Error::Closed));
                break 'run;
            }
            Err(err) => {
                tracing::error!(error = %err, "output processor chain failed");
                let _ = ack.send(Err(err));
            }
        }
    }

    for processor in &mut chain {
        processor.close();
    }
    drop(child_tx);

    let child = child.lock().await;
    child.close_async();
    if let Err(err) = child.wait_for_close(Duration::from_secs(5)).await {
        tracing::warn!(error = %err, "child output did not close in time");
    }
    shutdown.complete();
}
