//! Switch - route each part through the first matching case.

use async_trait::async_trait;

use sluice_message::{Batch, Error, Part};

use crate::expr::PartPredicate;
use crate::{execute_all, BoxProcessor, Processor};

#[cfg(test)]
#[path = "switch_test.rs"]
mod tests;

/// One switch case: an optional check, the processors applied to parts
/// the case claims, and whether the case's output continues into the
/// following case.
pub struct SwitchCase {
    check: Option<PartPredicate>,
    processors: Vec<BoxProcessor>,
    fall_through: bool,
}

impl SwitchCase {
    /// A case claiming parts for which `check` returns true. A case
    /// without a check claims every part that reaches it.
    pub fn new(check: Option<PartPredicate>, processors: Vec<BoxProcessor>) -> Self {
        Self {
            check,
            processors,
            fall_through: false,
        }
    }

    /// Hand this case's output to the following case as well, without
    /// evaluating its check.
    #[must_use]
    pub fn with_fall_through(mut self, fall_through: bool) -> Self {
        self.fall_through = fall_through;
        self
    }
}

/// First-match routing over ordered cases.
///
/// Each part is claimed by the first case whose check passes and is
/// processed by that case's children; with `fall_through` the case's
/// output is piped into the next case unconditionally. Parts matching no
/// case pass through unchanged. The output batch is re-assembled in
/// original part order; a case whose processors change the part count
/// keeps its group's first position.
pub struct Switch {
    cases: Vec<SwitchCase>,
}

impl Switch {
    /// A switch over the given cases.
    pub fn new(cases: Vec<SwitchCase>) -> Self {
        Self { cases }
    }
}

#[async_trait]
impl Processor for Switch {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        // Parts still waiting for a matching case, keyed by original
        // position.
        let mut remaining: Vec<(usize, Part)> = batch.into_parts().into_iter().enumerate().collect();
        // Output of a fall-through case, handed to the next case without
        // a check.
        let mut carry: Vec<(usize, Part)> = Vec::new();
        // Finished parts, keyed by original position.
        let mut finished: Vec<(usize, Part)> = Vec::new();

        for case in self.cases.iter_mut() {
            let mut claimed = std::mem::take(&mut carry);
            let mut unmatched = Vec::with_capacity(remaining.len());
            for (position, part) in remaining {
                let matches = match &case.check {
                    Some(check) => check(&part),
                    None => true,
                };
                if matches {
                    claimed.push((position, part));
                } else {
                    unmatched.push((position, part));
                }
            }
            remaining = unmatched;

            if claimed.is_empty() {
                continue;
            }

            let positions: Vec<usize> = claimed.iter().map(|(p, _)| *p).collect();
            let group: Batch = claimed.into_iter().map(|(_, part)| part).collect();
            let results = execute_all(&mut case.processors, vec![group]).await?;
            let parts: Vec<Part> = results.into_iter().flat_map(Batch::into_parts).collect();

            let keyed: Vec<(usize, Part)> = if parts.len() == positions.len() {
                positions.into_iter().zip(parts).collect()
            } else {
                // Count changed: the whole group keeps its first
                // original position.
                let anchor = positions[0];
                parts.into_iter().map(|part| (anchor, part)).collect()
            };

            if case.fall_through {
                carry = keyed;
            } else {
                finished.extend(keyed);
            }
        }

        // A trailing fall-through case, and parts no case claimed, land
        // in the output unchanged.
        finished.extend(carry);
        finished.extend(remaining);
        finished.sort_by_key(|(position, _)| *position);

        let out: Batch = finished.into_iter().map(|(_, part)| part).collect();
        if out.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![out])
    }

    fn close(&mut self) {
        for case in &mut self.cases {
            for child in &mut case.processors {
                child.close();
            }
        }
    }
}
