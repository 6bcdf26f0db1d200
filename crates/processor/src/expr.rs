//! The seam between the fabric and the expression language.
//!
//! Interpolated expressions are an external collaborator; combinators
//! only ever see them as pre-compiled closures. Mapping failures that the
//! source language models as thrown exceptions surface here as explicit
//! [`MapError`] results.

use std::fmt;
use std::sync::Arc;

use sluice_message::{Batch, Part};

/// A compiled boolean expression evaluated against a single part.
///
/// Used by batching `check` triggers and switch case checks.
pub type PartPredicate = Arc<dyn Fn(&Part) -> bool + Send + Sync>;

/// A compiled interpolated string expression evaluated against the part
/// at `index` within a batch.
///
/// Used by sleep durations and metric values/labels.
pub type FieldExpr = Arc<dyn Fn(&Batch, usize) -> String + Send + Sync>;

/// A failure raised by a request or result mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MapError(pub String);

impl MapError {
    /// A mapping failure with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MapError {}

/// A branch request mapping: derives the branch input from one part.
///
/// `Ok(None)` deletes the part from the branch, in which case it passes
/// through the combinator unmodified and skips the result stage.
pub type RequestMap = Arc<dyn Fn(&Part, usize) -> Result<Option<Part>, MapError> + Send + Sync>;

/// A branch result mapping: merges one branch output part back into the
/// original part it was derived from.
pub type ResultMap = Arc<dyn Fn(&mut Part, &Part, usize) -> Result<(), MapError> + Send + Sync>;

/// A constant field expression, for configurations without interpolation.
pub fn constant(value: impl Into<String>) -> FieldExpr {
    let value = value.into();
    Arc::new(move |_, _| value.clone())
}
