//! Metric sink contracts.
//!
//! All handles use `&self` and are `Send + Sync`, so observations are
//! lock-free at the call site and safe from any worker.

use std::sync::Arc;

/// A monotonically increasing counter.
pub trait Counter: Send + Sync {
    /// Increment by `delta`.
    fn incr(&self, delta: i64);
}

/// A gauge holding the last value set.
pub trait Gauge: Send + Sync {
    /// Set the current value.
    fn set(&self, value: i64);
}

/// A timing series, recorded in nanoseconds.
pub trait Timer: Send + Sync {
    /// Record one timing observation.
    fn timing(&self, nanos: i64);
}

/// A counter family keyed by label values.
pub trait CounterVec: Send + Sync {
    /// The counter for the given label values.
    fn with(&self, label_values: &[String]) -> Arc<dyn Counter>;
}

/// A gauge family keyed by label values.
pub trait GaugeVec: Send + Sync {
    /// The gauge for the given label values.
    fn with(&self, label_values: &[String]) -> Arc<dyn Gauge>;
}

/// A timer family keyed by label values.
pub trait TimerVec: Send + Sync {
    /// The timer for the given label values.
    fn with(&self, label_values: &[String]) -> Arc<dyn Timer>;
}

/// Factory for named metric handles.
///
/// Label *names* are fixed when a family handle is resolved; label
/// *values* are supplied per observation through the vec types.
pub trait Metrics: Send + Sync {
    /// Resolve a counter named `name`.
    fn counter(&self, name: &str) -> Arc<dyn Counter>;

    /// Resolve a counter family named `name` with the given label names.
    fn counter_vec(&self, name: &str, label_names: &[&str]) -> Arc<dyn CounterVec>;

    /// Resolve a gauge named `name`.
    fn gauge(&self, name: &str) -> Arc<dyn Gauge>;

    /// Resolve a gauge family named `name` with the given label names.
    fn gauge_vec(&self, name: &str, label_names: &[&str]) -> Arc<dyn GaugeVec>;

    /// Resolve a timer named `name`.
    fn timer(&self, name: &str) -> Arc<dyn Timer>;

    /// Resolve a timer family named `name` with the given label names.
    fn timer_vec(&self, name: &str, label_names: &[&str]) -> Arc<dyn TimerVec>;
}
