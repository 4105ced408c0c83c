//! # Status Reporting
//!
//! Every transition of a CertificateRequest goes through [`Reconciler::set_status`]:
//! the `Ready` condition is replaced on the working copy, one Event mirrors it, and the
//! status difference to the fetched snapshot is merge-patched onto the status
//! subresource.

use kube::runtime::events::EventType;
use kube::Resource;
use tracing::debug;

use crate::controller::client::{ObjectKey, StoreError};
use crate::controller::patch::status_patch;
use crate::controller::reconciler::types::Reconciler;
use crate::crd::{CertificateRequest, ConditionStatus};

impl Reconciler {
    /// Record `Ready=<status>/<reason>` on `request` and persist it.
    ///
    /// The Event is a Warning only for `status=False`. An unchanged status is not
    /// written again.
    pub(crate) async fn set_status(
        &self,
        request: &mut CertificateRequest,
        snapshot: &CertificateRequest,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        request.set_ready_condition(status, reason, message, &now);

        let event_type = if status == ConditionStatus::False {
            EventType::Warning
        } else {
            EventType::Normal
        };
        self.events
            .record(&request.object_ref(&()), event_type, reason, message)
            .await;

        let key = ObjectKey::from_resource(&*request);
        match status_patch(snapshot, request)? {
            Some(patch) => self.requests.patch_request_status(&key, &patch).await,
            None => {
                debug!(certificaterequest = %key, "Status unchanged, skipping update");
                Ok(())
            }
        }
    }
}
