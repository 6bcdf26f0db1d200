//! Sluice - Batch
//!
//! The dynamic batching policy used as a prefix to outputs: parts
//! accumulate until a count, byte-size, period or per-part check trigger
//! fires, at which point the accumulated batch is flushed through the
//! policy's processors and emitted downstream.

mod policy;

pub use policy::Policy;

pub use sluice_config::BatchingConfig;
