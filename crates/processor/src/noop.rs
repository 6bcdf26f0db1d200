//! Identity processor.

use async_trait::async_trait;

use sluice_message::{Batch, Error};

use crate::Processor;

/// Passes batches through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl Processor for Noop {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        Ok(vec![batch])
    }
}
