//! In-memory metric aggregator.
//!
//! Keeps every series in a shared map keyed by name plus rendered label
//! values. Used by tests to assert on emitted metrics and by local
//! introspection endpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::{Counter, CounterVec, Gauge, GaugeVec, Metrics, Timer, TimerVec};

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;

type Series = Arc<AtomicI64>;

/// Shared map of series values.
///
/// Labelled series are keyed `name{v1,v2}` in label-name order; unlabelled
/// series are keyed by bare name. Counter increments add, gauges and
/// timers store the last value.
#[derive(Debug, Clone, Default)]
pub struct LocalMetrics {
    series: Arc<Mutex<HashMap<String, Series>>>,
}

impl LocalMetrics {
    /// An empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value of the series under `key`, if it was ever
    /// observed.
    pub fn value(&self, key: &str) -> Option<i64> {
        self.series
            .lock()
            .expect("metrics lock")
            .get(key)
            .map(|s| s.load(Ordering::Relaxed))
    }

    /// Snapshot of every series.
    pub fn snapshot(&self) -> HashMap<String, i64> {
        self.series
            .lock()
            .expect("metrics lock")
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }

    fn series(&self, key: String) -> Series {
        self.series
            .lock()
            .expect("metrics lock")
            .entry(key)
            .or_default()
            .clone()
    }
}

fn labelled_key(name: &str, label_values: &[String]) -> String {
    format!("{}{{{}}}", name, label_values.join(","))
}

struct CounterHandle(Series);

impl Counter for CounterHandle {
    fn incr(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }
}

struct SetHandle(Series);

impl Gauge for SetHandle {
    fn set(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }
}

impl Timer for SetHandle {
    fn timing(&self, nanos: i64) {
        self.0.store(nanos, Ordering::Relaxed);
    }
}

struct VecHandle {
    metrics: LocalMetrics,
    name: String,
}

impl CounterVec for VecHandle {
    fn with(&self, label_values: &[String]) -> Arc<dyn Counter> {
        Arc::new(CounterHandle(
            self.metrics.series(labelled_key(&self.name, label_values)),
        ))
    }
}

impl GaugeVec for VecHandle {
    fn with(&self, label_values: &[String]) -> Arc<dyn Gauge> {
        Arc::new(SetHandle(
            self.metrics.series(labelled_key(&self.name, label_values)),
        ))
    }
}

impl TimerVec for VecHandle {
    fn with(&self, label_values: &[String]) -> Arc<dyn Timer> {
        Arc::new(SetHandle(
            self.metrics.series(labelled_key(&self.name, label_values)),
        ))
    }
}

impl Metrics for LocalMetrics {
    fn counter(&self, name: &str) -> Arc<dyn Counter> {
        Arc::new(CounterHandle(self.series(name.to_owned())))
    }

    fn counter_vec(&self, name: &str, _label_names: &[&str]) -> Arc<dyn CounterVec> {
        Arc::new(VecHandle {
            metrics: self.clone(),
            name: name.to_owned(),
        })
    }

    fn gauge(&self, name: &str) -> Arc<dyn Gauge> {
        Arc::new(SetHandle(self.series(name.to_owned())))
    }

    fn gauge_vec(&self, name: &str, _label_names: &[&str]) -> Arc<dyn GaugeVec> {
        Arc::new(VecHandle {
            metrics: self.clone(),
            name: name.to_owned(),
        })
    }

    fn timer(&self, name: &str) -> Arc<dyn Timer> {
        Arc::new(SetHandle(self.series(name.to_owned())))
    }

    fn timer_vec(&self, name: &str, _label_names: &[&str]) -> Arc<dyn TimerVec> {
        Arc::new(VecHandle {
            metrics: self.clone(),
            name: name.to_owned(),
        })
    }
}
