//! No-op metric sink.

use std::sync::Arc;

use crate::traits::{Counter, CounterVec, Gauge, GaugeVec, Metrics, Timer, TimerVec};

/// Discards every observation. The default sink when metrics are
/// disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

struct NoopHandle;

impl Counter for NoopHandle {
    fn incr(&self, _delta: i64) {}
}

impl Gauge for NoopHandle {
    fn set(&self, _value: i64) {}
}

impl Timer for NoopHandle {
    fn timing(&self, _nanos: i64) {}
}

impl CounterVec for NoopHandle {
    fn with(&self, _label_values: &[String]) -> Arc<dyn Counter> {
        Arc::new(NoopHandle)
    }
}

impl GaugeVec for NoopHandle {
    fn with(&self, _label_values: &[String]) -> Arc<dyn Gauge> {
        Arc::new(NoopHandle)
    }
}

impl TimerVec for NoopHandle {
    fn with(&self, _label_values: &[String]) -> Arc<dyn Timer> {
        Arc::new(NoopHandle)
    }
}

impl Metrics for NoopMetrics {
    fn counter(&self, _name: &str) -> Arc<dyn Counter> {
        Arc::new(NoopHandle)
    }

    fn counter_vec(&self, _name: &str, _label_names: &[&str]) -> Arc<dyn CounterVec> {
        Arc::new(NoopHandle)
    }

    fn gauge(&self, _name: &str) -> Arc<dyn Gauge> {
        Arc::new(NoopHandle)
    }

    fn gauge_vec(&self, _name: &str, _label_names: &[&str]) -> Arc<dyn GaugeVec> {
        Arc::new(NoopHandle)
    }

    fn timer(&self, _name: &str) -> Arc<dyn Timer> {
        Arc::new(NoopHandle)
    }

    fn timer_vec(&self, _name: &str, _label_names: &[&str]) -> Arc<dyn TimerVec> {
        Arc::new(NoopHandle)
    }
}
