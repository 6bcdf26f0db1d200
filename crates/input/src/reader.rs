//! The reader contract implemented by concrete input adapters.

use async_trait::async_trait;

use sluice_message::{AckResult, Batch, Error};

/// Callback invoked with a transaction's final result.
///
/// The adapter commits the external record on `Ok(())` and arranges a
/// replay otherwise.
pub type AckFn = Box<dyn FnOnce(AckResult) + Send>;

/// A connection to an external stream of records.
///
/// The wrapper in [`crate::spawn_reader`] owns the retry and ack
/// plumbing; implementations only translate payloads.
#[async_trait]
pub trait Reader: Send {
    /// Establish the connection. Called before the first read and again
    /// after any read fails with [`Error::NotConnected`].
    async fn connect(&mut self) -> Result<(), Error>;

    /// Pull the next batch along with the callback that commits it.
    ///
    /// Transient failures surface [`Error::NotConnected`] (triggering a
    /// reconnect) or [`Error::Timeout`] (retried in place).
    async fn read_batch(&mut self) -> Result<(Batch, AckFn), Error>;

    /// Release the connection. Called once during shutdown.
    async fn close(&mut self);
}
