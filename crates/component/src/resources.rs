//! Late-bound resource lookup.
//!
//! Components never hold direct references to one another; every
//! cross-reference is a label resolved through a [`Resources`]
//! implementation at the moment of use. Lookups fail fast with
//! `unable to locate resource: <label>` instead of blocking, so resources
//! may be declared in any order and callers retry once everything is up.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use sluice_message::{Error, Transaction};

use crate::{BoxProcessor, Cache, RateLimit};

/// A labelled processor handed out by the registry.
///
/// Concurrent accessors serialise on the mutex around `process`; the
/// registry's own lock is held only for the map lookup.
pub type SharedProcessor = Arc<Mutex<BoxProcessor>>;

/// Label-indexed lookup of shared resources.
///
/// `probe_*` reports whether a label is currently registered without
/// touching the resource. The typed lookups return a cheap shared handle
/// or [`Error::ResourceNotFound`]; they never block waiting for a label
/// to appear.
pub trait Resources: Send + Sync {
    /// Whether a cache is registered under `label`.
    fn probe_cache(&self, label: &str) -> bool;

    /// The cache registered under `label`.
    fn cache(&self, label: &str) -> Result<Arc<dyn Cache>, Error>;

    /// Whether a rate limit is registered under `label`.
    fn probe_rate_limit(&self, label: &str) -> bool;

    /// The rate limit registered under `label`.
    fn rate_limit(&self, label: &str) -> Result<Arc<dyn RateLimit>, Error>;

    /// Whether a processor is registered under `label`.
    fn probe_processor(&self, label: &str) -> bool;

    /// The processor registered under `label`.
    fn processor(&self, label: &str) -> Result<SharedProcessor, Error>;

    /// Register a named in-process transaction channel, replacing any
    /// previous holder of `name`.
    fn set_pipe(&self, name: &str, tx: mpsc::Sender<Transaction>);

    /// The channel registered under `name`, if any.
    fn get_pipe(&self, name: &str) -> Option<mpsc::Sender<Transaction>>;

    /// Unregister `name`, but only if `tx` is the exact channel
    /// currently registered; a stale unregister is a no-op.
    fn unset_pipe(&self, name: &str, tx: &mpsc::Sender<Transaction>);
}
