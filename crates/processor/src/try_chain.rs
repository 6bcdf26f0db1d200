//! Try chain - abort remaining children for parts that fail.

use async_trait::async_trait;

use sluice_message::{Batch, Error};

use crate::{BoxProcessor, Processor};

#[cfg(test)]
#[path = "try_chain_test.rs"]
mod tests;

/// Runs children in order over each part, skipping the remaining children
/// for any part that picks up an error marker.
///
/// Parts entering with a marker already set are passed through untouched.
/// Unaffected parts continue through the full chain.
pub struct TryChain {
    children: Vec<BoxProcessor>,
}

impl TryChain {
    /// A try chain over the given children.
    pub fn new(children: Vec<BoxProcessor>) -> Self {
        Self { children }
    }
}

#[async_trait]
impl Processor for TryChain {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let mut out = Batch::new();
        for part in batch {
            if part.error().is_some() {
                out.push(part);
                continue;
            }

            // The part may be split by a child; the chain continues over
            // all derivatives until one of them fails.
            let mut single = Batch::new();
            single.push(part);
            let mut current = vec![single];
            for child in self.children.iter_mut() {
                if current.is_empty() {
                    break;
                }
                let mut next = Vec::with_capacity(current.len());
                for b in current {
                    next.extend(child.process(b).await?);
                }
                current = next;
                let failed = current
                    .iter()
                    .any(|b| b.iter().any(|p| p.error().is_some()));
                if failed {
                    break;
                }
            }
            for b in current {
                out.append(b);
            }
        }

        if out.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![out])
    }

    fn close(&mut self) {
        for child in &mut self.children {
            child.close();
        }
    }
}
