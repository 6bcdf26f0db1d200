//! Sluice - Pipeline
//!
//! The ordered processor chain connecting an input transaction stream to
//! an output transaction stream, executed by a fixed-size worker pool.
//!
//! # Design
//!
//! - Workers pull transactions from a shared upstream channel and run
//!   their own processor chain, instantiated per worker from factories,
//!   so stateful processors are never shared.
//! - Each emitted batch becomes a derived downstream transaction; acks
//!   are collapsed back onto the upstream ack with fan-in tracking,
//!   first error winning.
//! - Shutdown is cooperative: workers drain the transaction they hold,
//!   ack anything unsent with the closed error, and the downstream
//!   channel closes once the last worker exits.

mod pipeline;

pub use pipeline::{Pipeline, PipelineHandle};
