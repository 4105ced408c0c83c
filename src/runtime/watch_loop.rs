//! # Watch Loop
//!
//! Runs the `kube_runtime` controller over CertificateRequests in all namespaces.

use futures::StreamExt;
use kube::api::Api;
use kube::Client;
use kube_runtime::controller::{Action, Config as RuntimeConfig, Error as ControllerError};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::controller::client::ObjectKey;
use crate::controller::reconciler::{needs_reconcile, Reconciler, ReconcilerError};
use crate::crd::CertificateRequest;
use crate::observability::metrics;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::server::ServerState;

/// Run the controller until a shutdown signal arrives.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let requests: Api<CertificateRequest> = Api::all(client);
    let concurrency = reconciler.config.max_concurrent_reconciliations;

    info!(concurrency, "Starting CertificateRequest controller");
    server_state.set_ready(true);

    let ctx = Arc::clone(&reconciler);
    Controller::new(requests, watcher::Config::default().any_semantic())
        .with_config(RuntimeConfig::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| {
            // A request deleted while backing off is never reconciled again.
            if let Err(ControllerError::ObjectNotFound(object)) = &result {
                ctx.forget_backoff(&ObjectKey {
                    namespace: object.namespace.clone(),
                    name: object.name.clone(),
                });
            }
            async move {
                match result {
                    Ok((object, _)) => debug!(certificaterequest = %object, "Reconciled"),
                    Err(e) => warn!(error = %e, "Controller error"),
                }
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller stopped gracefully");
    Ok(())
}

/// Reconcile one CertificateRequest within the configured timeout.
pub async fn reconcile(
    request: Arc<CertificateRequest>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::from_resource(request.as_ref());
    if !needs_reconcile(&request) {
        debug!(certificaterequest = %key, "CertificateRequest already issued");
        return Ok(Action::await_change());
    }

    let span = tracing::info_span!("reconcile", certificaterequest = %key);
    async move {
        metrics::increment_reconciliations();
        let timeout = ctx.config.reconcile_timeout;
        let start = Instant::now();
        let result = match tokio::time::timeout(timeout, ctx.reconcile_request(&key)).await {
            Ok(result) => result,
            Err(_) => Err(ReconcilerError::Timeout(timeout)),
        };
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        let outcome = result?;
        ctx.forget_backoff(&key);
        if let Some(delay) = outcome.requeue_after() {
            debug!(certificaterequest = %key, "Requeue in {}s", delay.as_secs());
        }
        Ok(outcome.into_action())
    }
    .instrument(span)
    .await
}
