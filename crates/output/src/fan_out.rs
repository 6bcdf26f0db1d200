//! Dynamic fan-out: broadcast transactions across a labelled set of
//! outputs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use sluice_component::ShutdownSignal;
use sluice_message::{tracker, Error, Transaction};

use crate::StreamOutput;

#[cfg(test)]
#[path = "fan_out_test.rs"]
mod tests;

/// Observability callback invoked with an endpoint's label.
pub type LabelCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct Child {
    tx: mpsc::Sender<Transaction>,
    output: Box<dyn StreamOutput>,
    started_at: Instant,
}

/// Broadcasts every consumed transaction to a dynamic labelled set of
/// outputs, collapsing their acks onto the upstream ack with first-error
/// semantics.
///
/// Members can be added, replaced and removed at runtime; removing one
/// closes only that endpoint. Closing the fan-out closes every member.
pub struct FanOut {
    children: Arc<Mutex<HashMap<String, Child>>>,
    buffer: usize,
    on_start: LabelCallback,
    on_stop: LabelCallback,
    shutdown: ShutdownSignal,
    started: bool,
}

impl FanOut {
    /// A fan-out whose member channels hold `buffer` transactions.
    pub fn new(buffer: usize, on_start: LabelCallback, on_stop: LabelCallback) -> Self {
        Self {
            children: Arc::new(Mutex::new(HashMap::new())),
            buffer,
            on_start,
            on_stop,
            shutdown: ShutdownSignal::new(),
            started: false,
        }
    }

    /// Add or replace the output under `label`, or close and remove it
    /// when `output` is `None`.
    pub async fn set_output(
        &self,
        label: &str,
        output: Option<Box<dyn StreamOutput>>,
    ) -> Result<(), Error> {
        let previous = self.children.lock().await.remove(label);
        if let Some(child) = previous {
            drop(child.tx);
            child.output.close_async();
            child.output.wait_for_close(Duration::from_secs(5)).await?;
            (self.on_stop)(label);
            tracing::info!(output = %label, "dynamic output stopped");
        }

        let Some(mut output) = output else {
            return Ok(());
        };

        let (tx, rx) = mpsc::channel(self.buffer);
        output.consume(rx)?;
        self.children.lock().await.insert(
            label.to_owned(),
            Child {
                tx,
                output,
                started_at: Instant::now(),
            },
        );
        (self.on_start)(label);
        tracing::info!(output = %label, "dynamic output started");
        Ok(())
    }

    /// Uptime per live label.
    pub async fn uptimes(&self) -> HashMap<String, Duration> {
        self.children
            .lock()
            .await
            .iter()
            .map(|(label, child)| (label.clone(), child.started_at.elapsed()))
            .collect()
    }

    /// Whether an output is currently registered under `label`.
    pub async fn contains(&self, label: &str) -> bool {
        self.children.lock().await.contains_key(label)
    }
}

#[async_trait]
impl StreamOutput for FanOut {
    fn consume(&mut self, rx: mpsc::Receiver<Transaction>) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;
        tokio::spawn(run_fan_out(
            rx,
            Arc::clone(&self.children),
            Arc::clone(&self.on_stop),
            self.shutdown.clone(),
        ));
        Ok(())
    }

    fn connected(&self) -> bool {
        // Connected when every member is; an empty set counts as down.
        match self.children.try_lock() {
            Ok(children) => {
                !children.is_empty() && children.values().all(|c| c.output.connected())
            }
            Err(_) => false,
        }
    }

    fn close_async(&self) {
        self.shutdown.close();
    }

    async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        self.shutdown.wait_for_close(timeout).await
    }
}

async fn run_fan_out(
    mut rx: mpsc::Receiver<Transaction>,
    children: Arc<Mutex<HashMap<String, Child>>>,
    on_stop: LabelCallback,
    shutdown: ShutdownSignal,
) {
    loop {
        let txn = tokio::select! {
            txn = rx.recv() => match txn {
                Some(txn) => txn,
                None => break,
            },
            _ = shutdown.closing() => break,
        };

        let (batch, ack) = txn.into_inner();
        let targets: Vec<mpsc::Sender<Transaction>> = children
            .lock()
            .await
            .values()
            .map(|child| child.tx.clone())
            .collect();

        if targets.is_empty() {
            tracing::warn!("no dynamic outputs registered, rejecting batch");
            let _ = ack.send(Err(Error::NotConnected));
            continue;
        }

        let batches = vec![batch; targets.len()];
        let derived = tracker::fan_in(ack, batches);
        for (child_tx, derived_txn) in targets.into_iter().zip(derived) {
            tokio::select! {
                sent = child_tx.send(derived_txn) => {
                    // A closed member resolves its derived transaction
                    // as closed through the drop path.
                    let _ = sent;
                }
                _ = shutdown.closing() => break,
            }
        }
    }

    // Tear down every member.
    let mut children = children.lock().await;
    for (label, child) in children.drain() {
        drop(child.tx);
        child.output.close_async();
        if let Err(err) = child.output.wait_for_close(Duration::from_secs(5)).await {
            tracing::warn!(output = %label, error = %err, "output did not close in time");
        }
        on_stop(&label);
    }
    drop(children);
    shutdown.complete();
}
