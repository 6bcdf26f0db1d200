//! Dynamic fan-in: a labelled set of inputs spliced into one aggregate
//! transaction channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use sluice_message::{Error, Transaction};

use crate::{Input, InputHandle};

#[cfg(test)]
#[path = "fan_in_test.rs"]
mod tests;

/// Observability callback invoked with an endpoint's label.
pub type LabelCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct Child {
    handle: InputHandle,
    forwarder: JoinHandle<()>,
    started_at: Instant,
}

/// Aggregates a dynamic set of labelled inputs into one transaction
/// channel.
///
/// Members can be added, replaced and removed at runtime without
/// disturbing the others; a member's in-flight transactions drain
/// through the aggregate before it is considered stopped. Closing the
/// fan-in closes every member.
pub struct FanIn {
    out_tx: mpsc::Sender<Transaction>,
    children: Arc<Mutex<HashMap<String, Child>>>,
    on_start: LabelCallback,
    on_stop: LabelCallback,
    handle: InputHandle,
}

impl FanIn {
    /// A fan-in with the given aggregate buffer, returning the
    /// controller and the aggregate input.
    pub fn new(buffer: usize, on_start: LabelCallback, on_stop: LabelCallback) -> (Self, Input) {
        let (out_tx, out_rx) = mpsc::channel(buffer);
        let handle = InputHandle::new(true);
        let input = Input::new(out_rx, handle.clone());
        let fan_in = Self {
            out_tx,
            children: Arc::new(Mutex::new(HashMap::new())),
            on_start,
            on_stop,
            handle,
        };
        (fan_in, input)
    }

    /// Add or replace the input under `label`, or close and remove it
    /// when `input` is `None`.
    ///
    /// Replacing waits for the previous holder of the label to stop, so
    /// its in-flight transactions are never dropped.
    pub async fn set_input(&self, label: &str, input: Option<Input>) -> Result<(), Error> {
        let previous = self.children.lock().await.remove(label);
        if let Some(child) = previous {
            child.handle.close_async();
            child.handle.wait_for_close(Duration::from_secs(5)).await?;
            let _ = child.forwarder.await;
            (self.on_stop)(label);
            tracing::info!(input = %label, "dynamic input stopped");
        }

        let Some(input) = input else {
            return Ok(());
        };

        let (mut rx, handle) = input.into_parts();
        let out_tx = self.out_tx.clone();
        let child_signal = handle.shutdown().clone();
        let forwarder = tokio::spawn(async move {
            loop {
                tokio::select! {
                    txn = rx.recv() => match txn {
                        Some(txn) => {
                            if out_tx.send(txn).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = child_signal.closing() => break,
                }
            }
        });

        self.children.lock().await.insert(
            label.to_owned(),
            Child {
                handle,
                forwarder,
                started_at: Instant::now(),
            },
        );
        (self.on_start)(label);
        tracing::info!(input = %label, "dynamic input started");
        Ok(())
    }

    /// Uptime per live label, in the order of the underlying map.
    pub async fn uptimes(&self) -> HashMap<String, Duration> {
        self.children
            .lock()
            .await
            .iter()
            .map(|(label, child)| (label.clone(), child.started_at.elapsed()))
            .collect()
    }

    /// Whether an input is currently registered under `label`.
    pub async fn contains(&self, label: &str) -> bool {
        self.children.lock().await.contains_key(label)
    }

    /// Prime shutdown of the aggregate and every member.
    pub fn close_async(&self) {
        self.handle.close_async();
        let children = Arc::clone(&self.children);
        tokio::spawn(async move {
            for child in children.lock().await.values() {
                child.handle.close_async();
            }
        });
    }

    /// Close every member, drain their forwarders and complete the
    /// aggregate shutdown.
    pub async fn wait_for_close(&self, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        let mut children = self.children.lock().await;
        for (label, child) in children.drain() {
            child.handle.close_async();
            let remaining = deadline.saturating_duration_since(Instant::now());
            child.handle.wait_for_close(remaining).await?;
            let _ = child.forwarder.await;
            (self.on_stop)(&label);
        }
        drop(children);
        self.handle.shutdown().complete();
        Ok(())
    }
}
