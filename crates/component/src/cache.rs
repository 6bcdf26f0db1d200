//! Cache resource contract and the in-process implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use sluice_message::Error;

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;

/// A keyed byte store registered as a labelled resource.
///
/// Implementations state their own re-entrancy guarantees; the contract
/// only requires safe concurrent invocation.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error>;

    /// Remove `key` if present.
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// Unbounded in-process cache backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.items.lock().expect("cache lock").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        self.items
            .lock()
            .expect("cache lock")
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.items.lock().expect("cache lock").remove(key);
        Ok(())
    }
}
