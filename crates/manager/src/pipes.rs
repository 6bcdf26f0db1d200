//! Named in-process transaction channels.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use sluice_message::Transaction;

#[cfg(test)]
#[path = "pipes_test.rs"]
mod tests;

/// A name-indexed map of transaction senders.
///
/// The map lock is held only for the lookup itself; no I/O happens under
/// it.
#[derive(Debug, Default)]
pub struct Pipes {
    inner: Mutex<HashMap<String, mpsc::Sender<Transaction>>>,
}

impl Pipes {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tx` under `name`, replacing any previous channel.
    pub fn set(&self, name: &str, tx: mpsc::Sender<Transaction>) {
        self.inner
            .lock()
            .expect("pipes lock")
            .insert(name.to_owned(), tx);
    }

    /// The channel registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<mpsc::Sender<Transaction>> {
        self.inner.lock().expect("pipes lock").get(name).cloned()
    }

    /// Remove `name`, but only if `tx` is the exact channel currently
    /// registered; a stale unregister is a no-op.
    pub fn unset(&self, name: &str, tx: &mpsc::Sender<Transaction>) {
        let mut inner = self.inner.lock().expect("pipes lock");
        if inner.get(name).is_some_and(|cur| cur.same_channel(tx)) {
            inner.remove(name);
        }
    }
}
