//! Error taxonomy shared by every component of the fabric.

use std::fmt;

use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors surfaced by components and attached to parts as sticky markers.
///
/// The enum is `Clone` because a single acknowledgement result may be
/// broadcast to many upstream transactions after a batch was merged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// A source or sink has lost its connection. Retried with backoff.
    #[error("not connected to target source or sink")]
    NotConnected,

    /// An action exceeded its deadline. Retried with backoff.
    #[error("action timed out")]
    Timeout,

    /// The distinguished shutdown signal used to terminate ack loops.
    #[error("type was closed")]
    Closed,

    /// An output was asked to consume a second transaction channel.
    #[error("type has already been started")]
    AlreadyStarted,

    /// A part body could not be parsed as JSON.
    #[error("failed to parse message as JSON: {0}")]
    Parse(String),

    /// A part body contained more than one top-level JSON document.
    #[error("message contains multiple valid documents")]
    MultipleDocuments,

    /// A serialised batch frame was malformed.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),

    /// A sticky per-part processing failure.
    #[error("{0}")]
    Part(String),

    /// A write failed for a subset of the parts in a batch.
    #[error(transparent)]
    Batch(BatchError),

    /// A resource lookup failed to resolve a label.
    #[error("unable to locate resource: {0}")]
    ResourceNotFound(String),

    /// Two resources of one kind were declared under the same label.
    #[error("{kind} resource label '{label}' collides with a previously defined resource")]
    LabelCollision { kind: String, label: String },

    /// A resource was declared without a label.
    #[error("{kind} resource has an empty label")]
    EmptyLabel { kind: String },

    /// Invalid component configuration, surfaced at construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An unrecognised component type discriminator.
    #[error("invalid component type '{0}'")]
    InvalidType(String),
}

impl Error {
    /// Create a sticky per-part error from any message.
    pub fn part(msg: impl Into<String>) -> Self {
        Self::Part(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error is transient and worth retrying locally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Timeout)
    }
}

/// An aggregate error carrying a base failure plus a sparse index map of
/// per-part failures.
///
/// Batch-aware outputs emit this after a partial write failure so that
/// upstream ack tracking can fail only the parts that did not land.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchError {
    base: String,
    indexed: Vec<(usize, Error)>,
}

impl BatchError {
    /// Create a batch error from a base failure.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            indexed: Vec::new(),
        }
    }

    /// Record a failure against the part at `index`.
    #[must_use]
    pub fn failed(mut self, index: usize, err: Error) -> Self {
        self.indexed.push((index, err));
        self
    }

    /// The failure recorded against `index`, if any.
    pub fn failed_on(&self, index: usize) -> Option<&Error> {
        self.indexed
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, e)| e)
    }

    /// Number of parts with a recorded failure.
    pub fn failed_len(&self) -> usize {
        self.indexed.len()
    }

    /// Iterate over the sparse index map.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.indexed.iter().map(|(i, e)| (*i, e))
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

impl std::error::Error for BatchError {}

impl From<BatchError> for Error {
    fn from(err: BatchError) -> Self {
        Self::Batch(err)
    }
}
