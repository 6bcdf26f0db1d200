//! Metric - emit custom metrics from message contents.

use std::sync::Arc;

use async_trait::async_trait;

use sluice_message::{Batch, Error};
use sluice_metrics::{Counter, CounterVec, Gauge, GaugeVec, Metrics, Timer, TimerVec};

use crate::expr::FieldExpr;
use crate::Processor;

#[cfg(test)]
#[path = "metric_test.rs"]
mod tests;

/// The metric flavours a [`Metric`] processor can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Increment by one per part; the value expression is ignored.
    Counter,
    /// Increment by the evaluated value.
    CounterBy,
    /// Set to the evaluated value.
    Gauge,
    /// Record the evaluated value as a timing in nanoseconds.
    Timing,
}

/// Labels attached to an emitted metric, values interpolated per part.
struct Labels {
    names: Vec<String>,
    values: Vec<FieldExpr>,
}

impl Labels {
    fn values(&self, batch: &Batch, index: usize) -> Vec<String> {
        self.values.iter().map(|v| v(batch, index)).collect()
    }
}

/// The resolved handle, one variant per kind and labelled-ness.
enum Handle {
    Counter(Arc<dyn Counter>),
    CounterVec(Arc<dyn CounterVec>),
    Gauge(Arc<dyn Gauge>),
    GaugeVec(Arc<dyn GaugeVec>),
    Timer(Arc<dyn Timer>),
    TimerVec(Arc<dyn TimerVec>),
}

/// Evaluates an interpolated `value` expression per part and drives a
/// named metric.
///
/// `counter` ignores the value entirely. The other kinds require the
/// value to render as a non-negative integer; anything else is logged
/// and skipped without marking the part. Parts always pass through
/// unchanged.
pub struct Metric {
    name: String,
    kind: MetricKind,
    value: Option<FieldExpr>,
    labels: Option<Labels>,
    handle: Handle,
}

impl Metric {
    /// A metric processor updating `name` on `metrics`.
    ///
    /// `labels` is a list of `(name, value-expression)` pairs; label
    /// names are registered up front, values render per part. `value` is
    /// required for every kind except [`MetricKind::Counter`]; a missing
    /// value is surfaced at construction.
    pub fn new(
        metrics: &dyn Metrics,
        name: impl Into<String>,
        kind: MetricKind,
        value: Option<FieldExpr>,
        labels: Vec<(String, FieldExpr)>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::config("metric name must not be empty"));
        }
        if value.is_none() && kind != MetricKind::Counter {
            return Err(Error::config("metric value expression must not be empty"));
        }

        let labels = if labels.is_empty() {
            None
        } else {
            let mut sorted = labels;
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Some(Labels {
                names: sorted.iter().map(|(n, _)| n.clone()).collect(),
                values: sorted.into_iter().map(|(_, v)| v).collect(),
            })
        };

        let handle = match (&labels, kind) {
            (None, MetricKind::Counter | MetricKind::CounterBy) => {
                Handle::Counter(metrics.counter(&name))
            }
            (None, MetricKind::Gauge) => Handle::Gauge(metrics.gauge(&name)),
            (None, MetricKind::Timing) => Handle::Timer(metrics.timer(&name)),
            (Some(labels), kind) => {
                let names: Vec<&str> = labels.names.iter().map(String::as_str).collect();
                match kind {
                    MetricKind::Counter | MetricKind::CounterBy => {
                        Handle::CounterVec(metrics.counter_vec(&name, &names))
                    }
                    MetricKind::Gauge => Handle::GaugeVec(metrics.gauge_vec(&name, &names)),
                    MetricKind::Timing => Handle::TimerVec(metrics.timer_vec(&name, &names)),
                }
            }
        };

        Ok(Self {
            name,
            kind,
            value,
            labels,
            handle,
        })
    }

    fn observe(&self, batch: &Batch, index: usize) -> Result<(), String> {
        let amount = match self.kind {
            MetricKind::Counter => 1,
            _ => {
                let rendered = match &self.value {
                    Some(value) => value(batch, index),
                    None => return Err("no value expression".to_owned()),
                };
                let parsed: i64 = rendered
                    .trim()
                    .parse()
                    .map_err(|e| format!("value '{rendered}' is not an integer: {e}"))?;
                if parsed < 0 {
                    return Err("value is negative".to_owned());
                }
                parsed
            }
        };

        match &self.handle {
            Handle::Counter(c) => c.incr(amount),
            Handle::Gauge(g) => g.set(amount),
            Handle::Timer(t) => t.timing(amount),
            Handle::CounterVec(c) => {
                let labels = self.labels.as_ref().expect("vec handle implies labels");
                c.with(&labels.values(batch, index)).incr(amount);
            }
            Handle::GaugeVec(g) => {
                let labels = self.labels.as_ref().expect("vec handle implies labels");
                g.with(&labels.values(batch, index)).set(amount);
            }
            Handle::TimerVec(t) => {
                let labels = self.labels.as_ref().expect("vec handle implies labels");
                t.with(&labels.values(batch, index)).timing(amount);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for Metric {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        for index in 0..batch.len() {
            if let Err(err) = self.observe(&batch, index) {
                tracing::error!(metric = %self.name, error = %err, "metric handler error");
            }
        }
        Ok(vec![batch])
    }
}
