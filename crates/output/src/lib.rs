//! Sluice - Output
//!
//! The streamed output contract. An output consumes a transaction
//! channel exactly once and writes batches with at-least-once semantics:
//! transient failures retry with capped backoff, partial failures
//! surface indexed batch errors so upstream ack tracking can fail
//! selectively.
//!
//! # Design
//!
//! - Concrete adapters implement [`Writer`]; [`WriterOutput`] wraps a
//!   writer with the shared consume/retry/ack plumbing and a
//!   `max_in_flight` write window.
//! - [`Batcher`] prefixes any output with a batching policy, fanning the
//!   flushed batch's single ack across every contributing upstream
//!   transaction.
//! - [`Processed`] prefixes any output with a processor chain, so
//!   per-component `processors` configuration runs before the write.
//! - [`FanOut`] broadcasts transactions across a dynamic labelled set of
//!   outputs.

mod batcher;
mod channel;
mod fan_out;
mod output;
mod processed;
mod writer;

pub use batcher::Batcher;
pub use channel::{ChannelWriter, PipeWriter};
pub use fan_out::{FanOut, LabelCallback};
pub use output::{StreamOutput, WriterOutput};
pub use processed::Processed;
pub use writer::Writer;
