//! Branch - map out, process, map back.
//!
//! A branch derives a child batch from the outer batch through a request
//! mapping, runs its children over the derived batch, and merges results
//! back into the original parts through a result mapping. The outer parts
//! are never mutated by the child stage itself; only a successful result
//! mapping writes back.

use async_trait::async_trait;

use sluice_message::{Batch, Error, Part};

use crate::expr::{RequestMap, ResultMap};
use crate::{execute_all, BoxProcessor, Processor};

#[cfg(test)]
#[path = "branch_test.rs"]
mod tests;

/// Three-stage per-part combinator: request map, child processors, result
/// map.
///
/// Stage failures annotate the affected parts with sticky markers
/// (`request mapping failed: …`, `result mapping failed: …`) and leave the
/// original content untouched. The child pipeline never observes the
/// caller's error markers, though a request mapping may read them and
/// copy them in explicitly.
pub struct Branch {
    request_map: Option<RequestMap>,
    children: Vec<BoxProcessor>,
    result_map: Option<ResultMap>,
}

/// Outcome of the request stage for one outer part.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Request {
    /// The part contributed a payload to the child batch.
    Mapped,
    /// The request mapping deleted the part; it bypasses the result
    /// stage unmodified.
    Deleted,
    /// The request mapping failed; the part was annotated and bypasses
    /// the result stage.
    Failed,
}

impl Branch {
    /// A branch with the given stages. Either mapping may be omitted: an
    /// absent request map sends each part to the children unchanged, an
    /// absent result map discards the child output.
    pub fn new(
        request_map: Option<RequestMap>,
        children: Vec<BoxProcessor>,
        result_map: Option<ResultMap>,
    ) -> Self {
        Self {
            request_map,
            children,
            result_map,
        }
    }

    fn map_requests(&self, batch: &Batch) -> (Vec<Request>, Batch, Vec<Option<Error>>) {
        let mut requests = Vec::with_capacity(batch.len());
        let mut child_batch = Batch::new();
        let mut annotations = vec![None; batch.len()];

        for (index, part) in batch.iter().enumerate() {
            let mut mapped = match self.request_map.as_ref() {
                None => part.deep_copy(),
                Some(map) => match map(part, index) {
                    Ok(Some(p)) => p,
                    Ok(None) => {
                        requests.push(Request::Deleted);
                        continue;
                    }
                    Err(err) => {
                        annotations[index] =
                            Some(Error::part(format!("request mapping failed: {err}")));
                        requests.push(Request::Failed);
                        continue;
                    }
                },
            };
            // The child stage must not inherit the caller's marker.
            mapped.set_error(None);
            child_batch.push(mapped);
            requests.push(Request::Mapped);
        }

        (requests, child_batch, annotations)
    }
}

#[async_trait]
impl Processor for Branch {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let mut out = batch;
        let (requests, child_batch, annotations) = self.map_requests(&out);
        let sent = child_batch.len();

        // Apply request-stage annotations before anything else so they
        // survive whatever happens downstream.
        for (index, annotation) in annotations.iter().enumerate() {
            if let Some(err) = annotation {
                if let Some(part) = out.get_mut(index) {
                    part.set_error(Some(err.clone()));
                }
            }
        }

        if sent == 0 {
            // Nothing entered the branch: deleted and failed parts pass
            // straight through.
            return Ok(vec![out]);
        }

        let results = execute_all(&mut self.children, vec![child_batch]).await?;
        let result_parts: Vec<&Part> = results.iter().flat_map(|b| b.iter()).collect();

        if result_parts.is_empty() {
            annotate_unless_failed(&mut out, &annotations, "child processors resulted in zero messages");
            return Ok(vec![out]);
        }

        if result_parts.len() != sent {
            let msg = format!(
                "message count from branch processors does not match request, \
                 started with {} messages, finished with {}",
                sent,
                out.len(),
            );
            annotate_unless_failed(&mut out, &annotations, &msg);
            return Ok(vec![out]);
        }

        if let Some(map) = self.result_map.as_ref() {
            let mut result_iter = result_parts.into_iter();
            for (index, request) in requests.iter().enumerate() {
                if *request != Request::Mapped {
                    continue;
                }
                let branch_part = result_iter.next().expect("result count verified");
                let original = out.get_mut(index).expect("request indexes original part");
                // Merge into a scratch copy so a failed mapping leaves
                // the original exactly as it entered.
                let mut scratch = original.clone();
                match map(&mut scratch, branch_part, index) {
                    Ok(()) => *original = scratch,
                    Err(err) => {
                        original.set_error(Some(Error::part(format!(
                            "result mapping failed: {err}"
                        ))));
                    }
                }
            }
        }

        Ok(vec![out])
    }

    fn close(&mut self) {
        for child in &mut self.children {
            child.close();
        }
    }
}

/// Annotate every part that does not already carry a request-stage
/// annotation.
fn annotate_unless_failed(batch: &mut Batch, annotations: &[Option<Error>], msg: &str) {
    for (index, annotation) in annotations.iter().enumerate() {
        if annotation.is_none() {
            if let Some(part) = batch.get_mut(index) {
                part.set_error(Some(Error::part(msg.to_owned())));
            }
        }
    }
}
