//! The worker-pool pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use sluice_component::{ProcessorFactory, ShutdownSignal};
use sluice_message::{tracker, Error, Transaction};
use sluice_processor::{execute_all, BoxProcessor};

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

/// An ordered chain of processor factories executed with fixed
/// parallelism.
pub struct Pipeline {
    threads: usize,
    factories: Vec<ProcessorFactory>,
}

impl Pipeline {
    /// A pipeline of `threads` workers, each running a chain built from
    /// `factories`.
    pub fn new(threads: usize, factories: Vec<ProcessorFactory>) -> Result<Self, Error> {
        if threads == 0 {
            return Err(Error::config("pipeline requires at least one thread"));
        }
        Ok(Self { threads, factories })
    }

    /// Start the worker pool, pulling from `rx` and sending derived
    /// transactions on `tx`.
    ///
    /// The downstream channel closes once every worker has exited,
    /// whether by upstream closure or by shutdown.
    pub fn spawn(
        self,
        rx: mpsc::Receiver<Transaction>,
        tx: mpsc::Sender<Transaction>,
    ) -> PipelineHandle {
        let shutdown = ShutdownSignal::new();
        let shared_rx = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.threads {
            let chain: Vec<BoxProcessor> =
                self.factories.iter().map(|factory| factory()).collect();
            workers.spawn(run_worker(
                worker_id,
                chain,
                Arc::clone(&shared_rx),
                tx.clone(),
                shutdown.clone(),
            ));
        }
        drop(tx);

        let supervisor = shutdown.clone();
        tokio::spawn(async move {
            while workers.join_next().await.is_some() {}
            supervisor.complete();
        });

        PipelineHandle { shutdown }
    }
}

/// Control handle for a running pipeline.
pub struct PipelineHandle {
    shutdown: ShutdownSignal,
}

impl PipelineHandle {
    /// Prime shutdown without blocking. Idempotent.
    pub fn close_async(&self) {
        self.shutdown.close();
    }

    /// Wait for every worker to exit and the downstream channel to
    /// close.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_for_close(timeout).await
    }
}

async fn run_worker(
    worker_id: usize,
    mut chain: Vec<BoxProcessor>,
    rx: Arc<Mutex<mpsc::Receiver<Transaction>>>,
    tx: mpsc::Sender<Transaction>,
    shutdown: ShutdownSignal,
) {
    tracing::debug!(worker = worker_id, "pipeline worker started");

    'pull: loop {
        let txn = {
            let mut rx = rx.lock().await;
            tokio::select! {
                txn = rx.recv() => match txn {
                    Some(txn) => txn,
                    None => break 'pull,
                },
                _ = shutdown.closing() => break 'pull,
            }
        };

        let (batch, ack) = txn.into_inner();
        match execute_all(&mut chain, vec![batch]).await {
            Ok(batches) if batches.is_empty() => {
                // Everything filtered out is a successful delivery.
                let _ = ack.send(Ok(()));
            }
            Ok(batches) => {
                for derived in tracker::fan_in(ack, batches) {
                    tokio::select! {
                        sent = tx.send(derived) => {
                            if sent.is_err() {
                                // Downstream gone; dropped transactions
                                // resolve upstream with the closed error.
                                break 'pull;
                            }
                        }
                        _ = shutdown.closing() => break 'pull,
                    }
                }
            }
            Err(Error::Closed) => {
                let _ = ack.send(Err(Error::Closed));
                break 'pull;
            }
            Err(err) => {
                tracing::error!(worker = worker_id, error = %err, "processor chain failed");
                let _ = ack.send(Err(err));
            }
        }
    }

    for processor in &mut chain {
        processor.close();
    }
    tracing::debug!(worker = worker_id, "pipeline worker stopped");
}
