//! # Observability
//!
//! - `metrics`: Prometheus metrics and the [`MetricsSink`] used by the reconciler
//! - `logging`: `tracing` subscriber set-up

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::{MetricsSink, PrometheusMetrics, RequestLabels};
