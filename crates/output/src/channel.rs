//! In-process channel writers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use sluice_component::Resources;
use sluice_message::{Batch, Error, Transaction};

use crate::Writer;

/// A writer delivering batches onto a local channel. Used by tests and
/// the pipe registry.
pub struct ChannelWriter {
    tx: mpsc::Sender<Batch>,
}

impl ChannelWriter {
    /// A writer over the sending half of a local batch channel.
    pub fn new(tx: mpsc::Sender<Batch>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Writer for ChannelWriter {
    async fn connect(&mut self) -> Result<(), Error> {
        if self.tx.is_closed() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    async fn write(&self, batch: &Batch) -> Result<(), Error> {
        self.tx
            .send(batch.clone())
            .await
            .map_err(|_| Error::NotConnected)
    }

    async fn close(&mut self) {}
}

/// A writer delivering batches into a named pipe from the resource
/// registry, as transactions whose acks propagate back to the caller.
///
/// Resolution is late-bound: the pipe may be registered after the writer
/// is built, and a missing pipe surfaces [`Error::NotConnected`] so the
/// hosting output retries with backoff.
pub struct PipeWriter {
    name: String,
    resources: Arc<dyn Resources>,
}

impl PipeWriter {
    /// A writer targeting the pipe registered under `name`.
    pub fn new(name: impl Into<String>, resources: Arc<dyn Resources>) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }
}

#[async_trait]
impl Writer for PipeWriter {
    async fn connect(&mut self) -> Result<(), Error> {
        if self.resources.get_pipe(&self.name).is_none() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    async fn write(&self, batch: &Batch) -> Result<(), Error> {
        let tx = self
            .resources
            .get_pipe(&self.name)
            .ok_or(Error::NotConnected)?;
        let (txn, ack_rx) = Transaction::new(batch.clone());
        tx.send(txn).await.map_err(|_| Error::NotConnected)?;
        match ack_rx.await {
            Ok(res) => res,
            Err(_) => Err(Error::Closed),
        }
    }

    async fn close(&mut self) {}
}
