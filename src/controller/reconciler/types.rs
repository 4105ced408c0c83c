//! # Types
//!
//! Core types for the reconciler.

use kube::runtime::controller::Action;
use kube::Client;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::client::{
    CertificateRequestClient, IssuerClient, KubeClient, ObjectKey, StoreError,
};
use crate::controller::events::{EventRecorder, KubeEventRecorder};
use crate::controller::issuer::ResolveError;
use crate::controller::provisioner::{Order, ProvisionerError, ProvisionerRegistry};
use crate::observability::{MetricsSink, PrometheusMetrics};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Failed to retrieve CertificateRequest {key}: {source}")]
    Fetch {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("{source}")]
    IssuerNotFound {
        #[source]
        source: ResolveError,
        requeue_after: Duration,
    },

    #[error("Failed to sign certificate request: {0}")]
    Sign(#[source] ProvisionerError),

    #[error("Failed to download certificate: {source}")]
    Download {
        #[source]
        source: ProvisionerError,
        requeue_after: Duration,
    },

    /// The order exists at DigiCert but its ids are not recorded on the request, so a
    /// retry cannot tell it apart from a request that was never ordered.
    #[error(
        "DigiCert order {} (certificate {}) was created but could not be recorded: {source}",
        .order.id,
        .order.certificate_id
    )]
    OrderOrphaned {
        order: Order,
        #[source]
        source: StoreError,
    },

    #[error("Failed to update CertificateRequest status: {0}")]
    StatusUpdate(#[source] StoreError),

    #[error("Reconciliation timed out after {0:?}")]
    Timeout(Duration),
}

impl ReconcilerError {
    /// Delay the failed reconciliation asks to be retried after. `None` leaves the
    /// delay to the error backoff.
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::IssuerNotFound { requeue_after, .. } | Self::Download { requeue_after, .. } => {
                Some(*requeue_after)
            }
            _ => None,
        }
    }

    /// A rejected order is not retried; the request stays `Failed` until it changes.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sign(_))
    }

    #[must_use]
    pub fn is_order_orphaned(&self) -> bool {
        matches!(self, Self::OrderOrphaned { .. })
    }
}

/// How a successful reconciliation wants to be scheduled next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Done,
    RequeueAfter(Duration),
}

impl ReconcileOutcome {
    #[must_use]
    pub fn requeue_after(self) -> Option<Duration> {
        match self {
            Self::Done => None,
            Self::RequeueAfter(delay) => Some(delay),
        }
    }

    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Self::Done => Action::await_change(),
            Self::RequeueAfter(delay) => Action::requeue(delay),
        }
    }
}

/// Shared context of all reconciliations
pub struct Reconciler {
    pub requests: Arc<dyn CertificateRequestClient>,
    pub issuers: Arc<dyn IssuerClient>,
    pub events: Arc<dyn EventRecorder>,
    pub provisioners: Arc<dyn ProvisionerRegistry>,
    pub metrics: Arc<dyn MetricsSink>,
    pub config: ControllerConfig,
    /// Error backoff per CertificateRequest, reset on success
    pub backoff_states: Mutex<HashMap<ObjectKey, FibonacciBackoff>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Context talking to the API server, reporting to the Prometheus registry
    #[must_use]
    pub fn new(
        client: Client,
        provisioners: Arc<dyn ProvisionerRegistry>,
        config: ControllerConfig,
    ) -> Self {
        let issuers = Arc::new(KubeClient::new(client.clone()));
        let requests = Arc::clone(&issuers);
        Self::with_parts(
            requests,
            issuers,
            Arc::new(KubeEventRecorder::new(client)),
            provisioners,
            Arc::new(PrometheusMetrics),
            config,
        )
    }

    /// Drop the error backoff of `key`, after a success or once the request is gone.
    pub fn forget_backoff(&self, key: &ObjectKey) {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    #[must_use]
    pub fn with_parts(
        requests: Arc<dyn CertificateRequestClient>,
        issuers: Arc<dyn IssuerClient>,
        events: Arc<dyn EventRecorder>,
        provisioners: Arc<dyn ProvisionerRegistry>,
        metrics: Arc<dyn MetricsSink>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            requests,
            issuers,
            events,
            provisioners,
            metrics,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }
}
