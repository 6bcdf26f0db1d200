//! The batching policy.

use std::time::Duration;

use tokio::time::Instant;

use sluice_message::{Batch, Error, Part};
use sluice_processor::expr::PartPredicate;
use sluice_processor::{execute_all, BoxProcessor};

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;

/// Accumulates parts and reports when a flush is due.
///
/// Triggers:
/// - `count`: flush once this many parts accumulated (0 disables)
/// - `byte_size`: flush once accumulated bodies reach this size (0
///   disables)
/// - `period`: flush on a timer measured from the previous flush
/// - `check`: per-part predicate; true triggers a flush
///
/// A policy with every trigger disabled and no processors is a noop;
/// callers are expected to elide it rather than pay for pass-through
/// batching.
pub struct Policy {
    count: usize,
    byte_size: usize,
    period: Option<Duration>,
    check: Option<PartPredicate>,
    processors: Vec<BoxProcessor>,

    parts: Vec<Part>,
    accumulated_bytes: usize,
    last_flush: Instant,
}

impl Policy {
    /// A policy with the given triggers and flush-time processors.
    pub fn new(
        count: usize,
        byte_size: usize,
        period: Option<Duration>,
        check: Option<PartPredicate>,
        processors: Vec<BoxProcessor>,
    ) -> Self {
        Self {
            count,
            byte_size,
            period,
            check,
            processors,
            parts: Vec::new(),
            accumulated_bytes: 0,
            last_flush: Instant::now(),
        }
    }

    /// Whether every trigger is disabled and no processors are attached.
    pub fn is_noop(&self) -> bool {
        self.count == 0
            && self.byte_size == 0
            && self.period.is_none()
            && self.check.is_none()
            && self.processors.is_empty()
    }

    /// Append a part, returning true when a flush is due.
    pub fn add(&mut self, part: Part) -> bool {
        self.accumulated_bytes += part.body().len();
        let check_fired = self.check.as_ref().is_some_and(|check| check(&part));
        self.parts.push(part);

        (self.count > 0 && self.parts.len() >= self.count)
            || (self.byte_size > 0 && self.accumulated_bytes >= self.byte_size)
            || check_fired
    }

    /// Number of parts accumulated since the last flush.
    pub fn count(&self) -> usize {
        self.parts.len()
    }

    /// Bytes accumulated since the last flush.
    pub fn byte_size(&self) -> usize {
        self.accumulated_bytes
    }

    /// Time remaining until the period trigger fires, measured from the
    /// last flush. `None` when no period is configured; a zero duration
    /// means the trigger is already due.
    pub fn until_next(&self) -> Option<Duration> {
        let period = self.period?;
        Some(period.saturating_sub(self.last_flush.elapsed()))
    }

    /// Flush the accumulated batch through the policy's processors.
    ///
    /// Returns `None` when nothing was accumulated (or everything was
    /// filtered out). Counters reset and the period timer restarts
    /// regardless.
    pub async fn flush(&mut self) -> Result<Option<Batch>, Error> {
        self.last_flush = Instant::now();
        self.accumulated_bytes = 0;
        if self.parts.is_empty() {
            return Ok(None);
        }

        let accumulated: Batch = self.parts.drain(..).collect();
        if self.processors.is_empty() {
            return Ok(Some(accumulated));
        }

        let results = execute_all(&mut self.processors, vec![accumulated]).await?;
        let mut merged = Batch::new();
        for batch in results {
            merged.append(batch);
        }
        if merged.is_empty() {
            return Ok(None);
        }
        Ok(Some(merged))
    }

    /// Release resources held by flush-time processors.
    pub fn close(&mut self) {
        for processor in &mut self.processors {
            processor.close();
        }
    }
}
