//! Sluice - Message
//!
//! Core data types that flow through the fabric: the [`Part`] / [`Batch`]
//! pair, the [`Transaction`] envelope that carries a batch together with its
//! acknowledgement channel, and the ack [`tracker`] helpers that collapse
//! fan-out acknowledgements back into a single upstream result.
//!
//! # Design
//!
//! - Part bodies are `bytes::Bytes`, so shallow batch copies share the
//!   underlying buffers and cloning is cheap.
//! - A part keeps a lazily parsed JSON view of its body; mutating either
//!   side invalidates the other, reads always observe the latest write.
//! - A transaction owns a `oneshot` ack sender, so exactly one ack per
//!   transaction is enforced by the type system.

mod batch;
mod codec;
mod error;
mod part;
mod transaction;

pub mod tracker;

pub use batch::Batch;
pub use codec::{decode_batch, encode_batch};
pub use error::{BatchError, Error};
pub use part::{Part, PartContext};
pub use transaction::{AckResult, AckSender, Tracked, Transaction};

/// Result alias used throughout the fabric.
pub type Result<T> = std::result::Result<T, Error>;
