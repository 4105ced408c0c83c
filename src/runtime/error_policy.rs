//! # Error Policy
//!
//! Decides when a failed reconciliation runs again:
//!
//! - a rejected order is not retried until the request changes
//! - errors that carry their own delay (issuer not found, download failure) use it
//! - everything else follows a per-request Fibonacci backoff, reset on success

use kube::runtime::controller::Action;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::controller::backoff::FibonacciBackoff;
use crate::controller::client::ObjectKey;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::CertificateRequest;
use crate::observability::metrics;

pub fn handle_reconciliation_error(
    obj: Arc<CertificateRequest>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = ObjectKey::from_resource(obj.as_ref());
    metrics::increment_reconciliation_errors();

    if let ReconcilerError::OrderOrphaned { order, .. } = error {
        metrics::increment_orphaned_orders();
        error!(
            certificaterequest = %key,
            order_id = order.id,
            certificate_id = order.certificate_id,
            error = %error,
            "DigiCert order is orphaned; check CertCentral before the request is retried"
        );
    } else {
        warn!(certificaterequest = %key, error = %error, "Reconciliation failed");
    }

    if error.is_terminal() {
        return Action::await_change();
    }

    if let Some(delay) = error.requeue_after() {
        info!(certificaterequest = %key, "Retrying in {}s", delay.as_secs());
        return Action::requeue(delay);
    }

    let (delay, error_count) = next_error_backoff(&ctx, &key);
    info!(
        certificaterequest = %key,
        error_count,
        "Retrying with Fibonacci backoff in {}s",
        delay.as_secs()
    );
    Action::requeue(delay)
}

/// Advance the error backoff of `key`.
pub(crate) fn next_error_backoff(ctx: &Reconciler, key: &ObjectKey) -> (Duration, u32) {
    let mut states = ctx
        .backoff_states
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let backoff = states.entry(key.clone()).or_insert_with(|| {
        FibonacciBackoff::new(
            ctx.config.error_backoff_min_secs,
            ctx.config.error_backoff_max_secs,
        )
    });
    let delay = backoff.next_backoff();
    (delay, backoff.error_count())
}
