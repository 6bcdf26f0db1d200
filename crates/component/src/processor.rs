//! The processor contract.
//!
//! A processor maps one batch to zero or more batches. Per-part failures
//! are attached to parts as sticky error markers and carried onwards, not
//! returned; the error return is reserved for terminal conditions, in
//! particular [`Error::Closed`] which tells the owning pipeline to stop
//! pulling.

use async_trait::async_trait;

use sluice_message::{Batch, Error};

/// A single-batch processor.
///
/// Returning `Ok(vec![])` means every part was filtered out. Returning
/// `Err(Error::Closed)` signals the owning worker to drain and exit;
/// other terminal errors are surfaced to the worker the same way.
///
/// `process` takes `&mut self` so stateful processors need no internal
/// locking; pipelines instantiate one chain per worker from factories
/// instead of sharing instances.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Process one batch.
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error>;

    /// Release any resources held by the processor. Called once by the
    /// owner during shutdown.
    fn close(&mut self) {}
}

/// Owned, type-erased processor.
pub type BoxProcessor = Box<dyn Processor>;

/// Per-slot processor factory.
///
/// A pipeline receives one factory per configured processor slot and
/// instantiates a fresh chain for every worker, so stateful processors
/// are never shared across workers.
pub type ProcessorFactory = Box<dyn Fn() -> BoxProcessor + Send + Sync>;
