//! # Reconciliation
//!
//! Drives one CertificateRequest from "new" to "certificate issued". The decision is
//! taken from the current object every time, never from remembered state:
//!
//! 1. Skip requests addressed to another issuer group or already carrying a certificate.
//! 2. Resolve the issuer (with default-namespace fallback), require it to be Ready and
//!    to have a registered provisioner.
//! 3. If an order was already placed and is pending, poll it. Otherwise place a new one
//!    and record its ids on the request before anything else is written.

use kube::ResourceExt;
use tracing::{debug, error, info, warn};

use crate::constants::{
    ANNOTATION_ACQUIRED, ANNOTATION_CERTIFICATE_NAME, ANNOTATION_CERT_ID, ANNOTATION_ORDER_ID,
    ANNOTATION_PRIVATE_KEY_SECRET_NAME, ISSUER_GROUP,
};
use crate::controller::client::{ObjectKey, StoreError};
use crate::controller::issuer::{is_issuer_ready, IssuerResolver};
use crate::controller::patch::object_patch;
use crate::controller::provisioner::Provisioner;
use crate::controller::reconciler::types::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::crd::{reasons, CertificateRequest, ConditionStatus};
use crate::observability::RequestLabels;

const MSG_ISSUED: &str = "Certificate issued";
const MSG_PENDING: &str = "Certificate request pending";
const MSG_FAILED: &str = "Certificate request failed";
const MSG_SIGN_FAILED: &str = "Failed to sign certificate request";

const NOT_READY_ISSUER_NOT_FOUND: &str = "issuer not found";
const NOT_READY_ISSUER: &str = "issuer not ready";
const NOT_READY_PROVISIONER: &str = "provisioner not found";

/// Whether a change to `request` needs a reconciliation at all. Requests that hold a
/// certificate and report it as issued are settled.
#[must_use]
pub fn needs_reconcile(request: &CertificateRequest) -> bool {
    let conditions = request.conditions();
    let settled = request.has_certificate()
        && conditions.iter().any(|c| c.status == ConditionStatus::True)
        && conditions.iter().any(|c| c.reason() == reasons::ISSUED);
    !settled
}

/// An order was placed by this controller and the request still waits for it.
/// Both parts are required: the annotation alone also survives a failed order.
fn is_pending_order(request: &CertificateRequest) -> bool {
    request.is_acquired()
        && request
            .ready_condition()
            .is_some_and(|c| c.reason() == reasons::PENDING)
}

fn request_labels(request: &CertificateRequest) -> RequestLabels<'_> {
    RequestLabels {
        name: request.metadata.name.as_deref().unwrap_or_default(),
        certificate: request
            .annotation(ANNOTATION_CERTIFICATE_NAME)
            .unwrap_or_default(),
        secret: request
            .annotation(ANNOTATION_PRIVATE_KEY_SECRET_NAME)
            .unwrap_or_default(),
    }
}

impl Reconciler {
    /// Reconcile the CertificateRequest at `key` once.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be read, the issuer cannot be resolved,
    /// the order cannot be placed or polled, or a write to the request fails. Errors
    /// that want a specific retry delay report it through
    /// [`ReconcilerError::requeue_after`].
    pub async fn reconcile_request(
        &self,
        key: &ObjectKey,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let snapshot = match self.requests.get_request(key).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(certificaterequest = %key, "CertificateRequest no longer exists");
                self.forget_backoff(key);
                return Ok(ReconcileOutcome::Done);
            }
            Err(source) => {
                return Err(ReconcilerError::Fetch {
                    key: key.clone(),
                    source,
                })
            }
        };
        let mut request = snapshot.clone();

        if request.spec.issuer_ref.group != ISSUER_GROUP {
            debug!(
                certificaterequest = %key,
                group = %request.spec.issuer_ref.group,
                "Issuer group not served by this controller, skipping"
            );
            return Ok(ReconcileOutcome::Done);
        }
        if request.has_certificate() {
            debug!(certificaterequest = %key, "Certificate already issued, skipping");
            return Ok(ReconcileOutcome::Done);
        }

        let not_ready_backoff = self.config.backoff_provisioner_not_ready;
        let resolver = IssuerResolver::new(
            self.issuers.as_ref(),
            &self.config.default_provisioner_namespace,
        );
        let resolved = match resolver
            .resolve(&request.spec.issuer_ref, key.namespace.as_deref().unwrap_or_default())
            .await
        {
            Ok(resolved) => resolved,
            Err(source) => {
                error!(
                    certificaterequest = %key,
                    issuer = %source.key,
                    kind = source.kind,
                    error = %source.source,
                    "Failed to retrieve issuer"
                );
                self.metrics
                    .increment_issuer_not_ready(&source.key.to_string(), NOT_READY_ISSUER_NOT_FOUND);
                let message = source.to_string();
                self.set_status_best_effort(
                    &mut request,
                    &snapshot,
                    ConditionStatus::False,
                    reasons::PENDING,
                    &message,
                )
                .await;
                return Err(ReconcilerError::IssuerNotFound {
                    source,
                    requeue_after: not_ready_backoff,
                });
            }
        };
        let issuer_kind = resolved.issuer.kind();

        if !is_issuer_ready(resolved.issuer.as_ref()) {
            info!(
                certificaterequest = %key,
                issuer = %resolved.key,
                kind = issuer_kind,
                "Issuer is not Ready"
            );
            self.metrics
                .increment_issuer_not_ready(&resolved.key.to_string(), NOT_READY_ISSUER);
            let message = format!("{issuer_kind} resource {} is not Ready", resolved.key);
            self.set_status(
                &mut request,
                &snapshot,
                ConditionStatus::False,
                reasons::PENDING,
                &message,
            )
            .await
            .map_err(ReconcilerError::StatusUpdate)?;
            return Ok(ReconcileOutcome::RequeueAfter(not_ready_backoff));
        }

        let Some(provisioner) = self.provisioners.load(&resolved.key) else {
            info!(
                certificaterequest = %key,
                issuer = %resolved.key,
                kind = issuer_kind,
                "No provisioner registered for issuer"
            );
            self.metrics
                .increment_issuer_not_ready(&resolved.key.to_string(), NOT_READY_PROVISIONER);
            let message = format!(
                "Failed to load provisioner for {issuer_kind} resource {}",
                resolved.key
            );
            self.set_status(
                &mut request,
                &snapshot,
                ConditionStatus::False,
                reasons::PENDING,
                &message,
            )
            .await
            .map_err(ReconcilerError::StatusUpdate)?;
            return Ok(ReconcileOutcome::RequeueAfter(not_ready_backoff));
        };

        if is_pending_order(&request) {
            self.poll_order(key, request, &snapshot, provisioner.as_ref())
                .await
        } else {
            self.place_order(key, request, &snapshot, provisioner.as_ref())
                .await
        }
    }

    async fn poll_order(
        &self,
        key: &ObjectKey,
        mut request: CertificateRequest,
        snapshot: &CertificateRequest,
        provisioner: &dyn Provisioner,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let order_id = request
            .annotation(ANNOTATION_ORDER_ID)
            .unwrap_or_default()
            .to_string();
        debug!(certificaterequest = %key, order_id = %order_id, "Order pending, downloading certificate");

        let failure = match provisioner.download(&request).await {
            Ok(downloaded) if !downloaded.cert_pem.is_empty() => {
                self.store_certificate(&mut request, &downloaded.ca_pem, &downloaded.cert_pem);
                self.set_status(
                    &mut request,
                    snapshot,
                    ConditionStatus::True,
                    reasons::ISSUED,
                    MSG_ISSUED,
                )
                .await
                .map_err(ReconcilerError::StatusUpdate)?;
                info!(certificaterequest = %key, order_id = %order_id, "Certificate issued");
                return Ok(ReconcileOutcome::Done);
            }
            Ok(_) => None,
            Err(e) => Some(e),
        };

        let requeue_after = self.config.backoff_request_pending;
        self.metrics
            .increment_request_pending(request_labels(&request), &order_id);

        match failure {
            Some(source) => {
                debug!(certificaterequest = %key, order_id = %order_id, error = %source, "Download failed");
                let message = format!("{MSG_PENDING}: {source}");
                self.set_status_best_effort(
                    &mut request,
                    snapshot,
                    ConditionStatus::False,
                    reasons::PENDING,
                    &message,
                )
                .await;
                Err(ReconcilerError::Download {
                    source,
                    requeue_after,
                })
            }
            None => {
                self.set_status(
                    &mut request,
                    snapshot,
                    ConditionStatus::False,
                    reasons::PENDING,
                    MSG_PENDING,
                )
                .await
                .map_err(ReconcilerError::StatusUpdate)?;
                Ok(ReconcileOutcome::RequeueAfter(requeue_after))
            }
        }
    }

    async fn place_order(
        &self,
        key: &ObjectKey,
        mut request: CertificateRequest,
        snapshot: &CertificateRequest,
        provisioner: &dyn Provisioner,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let signed = match provisioner.sign(&request).await {
            Ok(signed) => signed,
            Err(source) => {
                error!(certificaterequest = %key, error = %source, "Failed to sign certificate request");
                self.metrics
                    .increment_request_error(request_labels(&request), MSG_SIGN_FAILED);
                let message = format!("{MSG_SIGN_FAILED}: {source}");
                self.set_status_best_effort(
                    &mut request,
                    snapshot,
                    ConditionStatus::False,
                    reasons::FAILED,
                    &message,
                )
                .await;
                return Err(ReconcilerError::Sign(source));
            }
        };

        let order = signed.order;
        let annotations = request.annotations_mut();
        annotations.insert(ANNOTATION_ACQUIRED.to_string(), "true".to_string());
        if order.id > 0 {
            annotations.insert(ANNOTATION_ORDER_ID.to_string(), order.id.to_string());
        }
        if order.certificate_id > 0 {
            annotations.insert(ANNOTATION_CERT_ID.to_string(), order.certificate_id.to_string());
        }
        if let Err(source) = self.persist_annotations(key, snapshot, &request).await {
            error!(
                certificaterequest = %key,
                order_id = order.id,
                certificate_id = order.certificate_id,
                error = %source,
                "DigiCert order created but not recorded on the CertificateRequest"
            );
            return Err(ReconcilerError::OrderOrphaned { order, source });
        }
        info!(
            certificaterequest = %key,
            order_id = order.id,
            certificate_id = order.certificate_id,
            "DigiCert order placed"
        );

        if !signed.cert_pem.is_empty() {
            self.store_certificate(&mut request, &signed.ca_pem, &signed.cert_pem);
            self.set_status(
                &mut request,
                snapshot,
                ConditionStatus::True,
                reasons::ISSUED,
                MSG_ISSUED,
            )
            .await
            .map_err(ReconcilerError::StatusUpdate)?;
            return Ok(ReconcileOutcome::Done);
        }

        if order.certificate_id > 0 {
            self.set_status(
                &mut request,
                snapshot,
                ConditionStatus::False,
                reasons::PENDING,
                MSG_PENDING,
            )
            .await
            .map_err(ReconcilerError::StatusUpdate)?;
            return Ok(ReconcileOutcome::RequeueAfter(
                self.config.backoff_provisioner_not_ready,
            ));
        }

        warn!(certificaterequest = %key, order_id = order.id, "Order returned neither certificate nor certificate id");
        self.metrics
            .increment_request_error(request_labels(&request), MSG_FAILED);
        self.set_status(
            &mut request,
            snapshot,
            ConditionStatus::Unknown,
            reasons::FAILED,
            MSG_FAILED,
        )
        .await
        .map_err(ReconcilerError::StatusUpdate)?;
        Ok(ReconcileOutcome::Done)
    }

    async fn persist_annotations(
        &self,
        key: &ObjectKey,
        snapshot: &CertificateRequest,
        request: &CertificateRequest,
    ) -> Result<(), StoreError> {
        match object_patch(snapshot, request)? {
            Some(patch) => self.requests.patch_request(key, &patch).await,
            None => Ok(()),
        }
    }

    fn store_certificate(&self, request: &mut CertificateRequest, ca_pem: &[u8], cert_pem: &[u8]) {
        if !ca_pem.is_empty() && !self.config.disable_root_ca {
            request.set_ca(ca_pem);
        }
        request.set_certificate(cert_pem);
    }

    /// Status write on a path that already failed; the original error is the one
    /// reported, so a failed write is only logged.
    async fn set_status_best_effort(
        &self,
        request: &mut CertificateRequest,
        snapshot: &CertificateRequest,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        if let Err(e) = self
            .set_status(request, snapshot, status, reason, message)
            .await
        {
            let key = ObjectKey::from_resource(&*request);
            warn!(
                certificaterequest = %key,
                error = %e,
                "Failed to update CertificateRequest status"
            );
        }
    }
}
