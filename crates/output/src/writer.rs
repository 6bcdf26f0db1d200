//! The writer contract implemented by concrete output adapters.

use async_trait::async_trait;

use sluice_message::{Batch, Error};

/// A connection to an external sink.
///
/// `write` takes `&self` so the wrapper can issue up to `max_in_flight`
/// writes concurrently through one shared handle; implementations keep
/// their connection state behind interior mutability. Reconnection runs
/// exclusively: the wrapper holds its write lock across `connect`.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Establish the connection. Called before the first write and again
    /// after any write fails with [`Error::NotConnected`].
    async fn connect(&mut self) -> Result<(), Error>;

    /// Write one batch.
    ///
    /// A lost connection surfaces [`Error::NotConnected`]; a partial
    /// failure surfaces [`Error::Batch`] recording which part indexes
    /// failed.
    async fn write(&self, batch: &Batch) -> Result<(), Error>;

    /// Release the connection. Called once during shutdown.
    async fn close(&mut self);
}
