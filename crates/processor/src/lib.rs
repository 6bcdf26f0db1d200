//! Sluice - Processor
//!
//! Processor combinators executed inside pipelines. The [`Processor`]
//! contract itself lives in `sluice-component`; this crate provides the
//! combinators that give pipelines their error-handling vocabulary:
//!
//! - [`Catch`] - recover parts whose error marker is set
//! - [`TryChain`] - skip remaining children once a part fails
//! - [`Branch`] - map out, process, map back without corrupting originals
//! - [`Switch`] - route parts through the first matching case
//! - [`Resource`] - late-bound delegation to a registry processor
//! - [`Sleep`] - cancellable interpolated pause
//! - [`Metric`] - emit custom metrics from message contents
//! - [`Noop`] - identity, useful in tests and as a registry default
//!
//! Every combinator honours the sticky error marker discipline: a part
//! entering with a marker keeps it unless the combinator's documented
//! behaviour is to clear or replace it.

mod branch;
mod catch;
mod metric;
mod noop;
mod resource;
mod sleep;
mod switch;
mod try_chain;

pub mod expr;

#[cfg(test)]
mod testutil;

pub use branch::Branch;
pub use catch::Catch;
pub use metric::{Metric, MetricKind};
pub use noop::Noop;
pub use resource::Resource;
pub use sleep::Sleep;
pub use switch::{Switch, SwitchCase};
pub use try_chain::TryChain;

pub use sluice_component::{BoxProcessor, Processor, ProcessorFactory};

use sluice_message::{Batch, Error};

/// Run a chain of processors over a set of batches, feeding every batch
/// produced by one processor into the next.
///
/// Empty intermediate results short-circuit: once every part has been
/// filtered out there is nothing left to process.
pub async fn execute_all(
    processors: &mut [BoxProcessor],
    batches: Vec<Batch>,
) -> Result<Vec<Batch>, Error> {
    let mut current = batches;
    for processor in processors.iter_mut() {
        if current.is_empty() {
            return Ok(Vec::new());
        }
        let mut next = Vec::with_capacity(current.len());
        for batch in current {
            next.extend(processor.process(batch).await?);
        }
        current = next;
    }
    Ok(current)
}
