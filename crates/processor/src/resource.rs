//! Resource - late-bound delegation to a registry processor.

use std::sync::Arc;

use async_trait::async_trait;

use sluice_component::Resources;
use sluice_message::{Batch, Error};

use crate::Processor;

#[cfg(test)]
#[path = "resource_test.rs"]
mod tests;

/// Delegates processing to a processor registered in the manager under a
/// label.
///
/// Resolution is late-bound: construction succeeds even if the referent
/// is not registered yet, and the first processed batch fails with
/// `unable to locate resource: <label>` if it still is not.
pub struct Resource {
    label: String,
    resources: Arc<dyn Resources>,
}

impl Resource {
    /// A resource processor resolving `label` through `resources`.
    pub fn new(label: impl Into<String>, resources: Arc<dyn Resources>) -> Self {
        Self {
            label: label.into(),
            resources,
        }
    }
}

#[async_trait]
impl Processor for Resource {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let shared = match self.resources.processor(&self.label) {
            Ok(shared) => shared,
            Err(err) => {
                tracing::error!(
                    processor = %self.label,
                    error = %err,
                    "failed to obtain processor resource"
                );
                return Err(err);
            }
        };
        let mut guard = shared.lock().await;
        guard.process(batch).await
    }
}
