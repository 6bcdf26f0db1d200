//! Capped exponential backoff shared by input reconnect loops and output
//! write retries.

use std::time::{Duration, Instant};

#[cfg(test)]
#[path = "backoff_test.rs"]
mod tests;

/// Capped exponential delay policy.
///
/// `next()` yields the delay to sleep before the following attempt,
/// growing by `multiplier` up to `max_interval`, and returns `None` once
/// an optional maximum elapsed budget is exhausted.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max_interval: Duration,
    multiplier: f64,
    max_elapsed: Option<Duration>,

    current: Duration,
    started: Option<Instant>,
}

impl Backoff {
    /// A policy starting at `initial` and capped at `max_interval`.
    pub fn new(initial: Duration, max_interval: Duration) -> Self {
        Self {
            initial,
            max_interval,
            multiplier: 2.0,
            max_elapsed: None,
            current: initial,
            started: None,
        }
    }

    /// Override the growth multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Give up after `max_elapsed` of cumulative retrying.
    #[must_use]
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }

    /// The next delay, or `None` when the elapsed budget is exhausted.
    pub fn next(&mut self) -> Option<Duration> {
        let started = *self.started.get_or_insert_with(Instant::now);
        if let Some(budget) = self.max_elapsed {
            if started.elapsed() >= budget {
                return None;
            }
        }
        let delay = self.current;
        let grown = self.current.mul_f64(self.multiplier);
        self.current = grown.min(self.max_interval);
        Some(delay)
    }

    /// Reset after a success so the next failure starts from `initial`.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.started = None;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(10))
    }
}
