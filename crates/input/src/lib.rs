//! Sluice - Input
//!
//! The streamed input contract. An input translates external records into
//! batches and exposes them as a single read-only transaction channel;
//! the external record is only committed once the transaction's ack
//! arrives with success.
//!
//! # Design
//!
//! - Concrete adapters implement [`Reader`]; [`spawn_reader`] wraps a
//!   reader with the shared connect/retry/ack plumbing and yields an
//!   [`Input`] handle.
//! - A lost connection negatively acks every in-flight transaction so
//!   upstream can decide to replay, then reconnects with capped backoff.
//! - [`FanIn`] aggregates a dynamic labelled set of inputs into one
//!   channel without dropping in-flight transactions when members change.
//! - [`Input::with_processors`] runs a per-component processor chain
//!   over every transaction before it reaches the consumer.

mod fan_in;
mod input;
mod processed;
mod reader;
mod reader_input;

pub use fan_in::{FanIn, LabelCallback};
pub use input::{Input, InputHandle};
pub use reader::{AckFn, Reader};
pub use reader_input::spawn_reader;
