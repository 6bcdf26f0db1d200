//! Batching policy configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::ComponentConfig;

#[cfg(test)]
#[path = "batching_test.rs"]
mod tests;

/// Batching triggers and flush-time processors, recognised by outputs as
/// an optional `batching` block.
///
/// A zero `count` or `byte_size` disables that trigger; an absent
/// `period` disables the timer. `check` holds an interpolated boolean
/// expression compiled by the hosting factory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Flush once this many parts have accumulated. Zero disables.
    pub count: usize,

    /// Flush once the accumulated bodies reach this many bytes. Zero
    /// disables.
    pub byte_size: usize,

    /// Flush on a timer measured from the previous flush.
    #[serde(with = "humantime_serde::option")]
    pub period: Option<Duration>,

    /// Interpolated boolean expression evaluated per appended part; true
    /// triggers a flush.
    pub check: Option<String>,

    /// Processors applied to each accumulated batch at flush time.
    pub processors: Vec<ComponentConfig>,
}

impl BatchingConfig {
    /// Whether every trigger is disabled and no processors are
    /// configured. Callers elide noop policies entirely.
    pub fn is_noop(&self) -> bool {
        self.count == 0
            && self.byte_size == 0
            && self.period.is_none()
            && self.check.is_none()
            && self.processors.is_empty()
    }
}
