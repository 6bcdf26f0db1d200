//! Sluice - Metrics
//!
//! Metric sink traits consumed by the fabric. Concrete exporter backends
//! are external collaborators; this crate carries the contract plus two
//! local implementations: [`NoopMetrics`] for production paths that have
//! metrics disabled and [`LocalMetrics`], an in-memory aggregator used by
//! tests and local introspection.
//!
//! # Design
//!
//! - Handles (`Counter`, `Gauge`, `Timer`) are cheap `Arc`s resolved once
//!   at component construction, never per message.
//! - Labelled variants resolve a handle per label-value vector, the way a
//!   Prometheus vec type would.

mod local;
mod noop;
mod traits;

pub use local::LocalMetrics;
pub use noop::NoopMetrics;
pub use traits::{Counter, CounterVec, Gauge, GaugeVec, Metrics, Timer, TimerVec};
