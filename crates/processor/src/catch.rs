//! Catch - recover parts whose error marker is set.

use async_trait::async_trait;

use sluice_message::{Batch, Error};

use crate::{execute_all, BoxProcessor, Processor};

#[cfg(test)]
#[path = "catch_test.rs"]
mod tests;

/// Runs its children over each part whose error marker is set on entry,
/// clearing the marker on success.
///
/// Children are applied to failed parts individually, so a child that
/// filters a part removes only that part from the output. Parts entering
/// without a marker pass through byte-identical, marker still clear. If
/// everything is filtered out the result is zero batches.
pub struct Catch {
    children: Vec<BoxProcessor>,
}

impl Catch {
    /// A catch over the given children.
    pub fn new(children: Vec<BoxProcessor>) -> Self {
        Self { children }
    }
}

#[async_trait]
impl Processor for Catch {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let mut out = Batch::new();
        for part in batch {
            if part.error().is_none() {
                out.push(part);
                continue;
            }

            let mut single = Batch::new();
            single.push(part);
            for recovered in execute_all(&mut self.children, vec![single]).await? {
                for mut p in recovered {
                    p.set_error(None);
                    out.push(p);
                }
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
