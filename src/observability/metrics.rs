//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `digicert_issuer_reconciliations_total` - Total number of reconciliations
//! - `digicert_issuer_reconciliation_errors_total` - Reconciliations that returned an error
//! - `digicert_issuer_reconciliation_duration_seconds` - Duration of reconciliations
//! - `digicert_issuer_orphaned_orders_total` - Orders created but not recorded on their request
//! - `digicert_issuer_issuer_not_ready_total` - Requests blocked on their issuer (`issuer`, `reason`)
//! - `digicert_issuer_request_pending_total` - Pending DigiCert orders
//!   (`name`, `certificate`, `secret`, `order_id`)
//! - `digicert_issuer_request_errors_total` - Failed requests
//!   (`name`, `certificate`, `secret`, `error`)
//!
//! The reconciler only sees the [`MetricsSink`] trait. [`PrometheusMetrics`] forwards
//! to the process registry served on `/metrics`.

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "digicert_issuer_reconciliations_total",
        "Total number of CertificateRequest reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "digicert_issuer_reconciliation_errors_total",
        "Total number of reconciliations that returned an error",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "digicert_issuer_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static ORPHANED_ORDERS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "digicert_issuer_orphaned_orders_total",
        "DigiCert orders created whose ids could not be recorded on the CertificateRequest",
    )
    .expect("Failed to create ORPHANED_ORDERS_TOTAL metric - this should never happen")
});

static ISSUER_NOT_READY_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "digicert_issuer_issuer_not_ready_total",
            "CertificateRequests blocked because their issuer or provisioner is not ready",
        ),
        &["issuer", "reason"],
    )
    .expect("Failed to create ISSUER_NOT_READY_TOTAL metric - this should never happen")
});

static REQUEST_PENDING_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "digicert_issuer_request_pending_total",
            "CertificateRequests whose DigiCert order is still pending",
        ),
        &["name", "certificate", "secret", "order_id"],
    )
    .expect("Failed to create REQUEST_PENDING_TOTAL metric - this should never happen")
});

static REQUEST_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "digicert_issuer_request_errors_total",
            "CertificateRequests that could not be issued",
        ),
        &["name", "certificate", "secret", "error"],
    )
    .expect("Failed to create REQUEST_ERRORS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(ORPHANED_ORDERS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ISSUER_NOT_READY_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEST_PENDING_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEST_ERRORS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_orphaned_orders() {
    ORPHANED_ORDERS_TOTAL.inc();
}

/// Identity labels of a CertificateRequest, taken from its name and the annotations
/// cert-manager sets on requests it creates for a Certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLabels<'a> {
    pub name: &'a str,
    pub certificate: &'a str,
    pub secret: &'a str,
}

/// Counters the reconciler reports to. Implementations must tolerate concurrent
/// increments from reconciliations of different requests.
pub trait MetricsSink: Send + Sync {
    fn increment_issuer_not_ready(&self, issuer: &str, reason: &str);
    fn increment_request_pending(&self, request: RequestLabels<'_>, order_id: &str);
    fn increment_request_error(&self, request: RequestLabels<'_>, error: &str);
}

/// [`MetricsSink`] backed by the process Prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn increment_issuer_not_ready(&self, issuer: &str, reason: &str) {
        ISSUER_NOT_READY_TOTAL
            .with_label_values(&[issuer, reason])
            .inc();
    }

    fn increment_request_pending(&self, request: RequestLabels<'_>, order_id: &str) {
        REQUEST_PENDING_TOTAL
            .with_label_values(&[request.name, request.certificate, request.secret, order_id])
            .inc();
    }

    fn increment_request_error(&self, request: RequestLabels<'_>, error: &str) {
        REQUEST_ERRORS_TOTAL
            .with_label_values(&[request.name, request.certificate, request.secret, error])
            .inc();
    }
}
