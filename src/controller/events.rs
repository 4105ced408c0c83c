//! # Kubernetes Events
//!
//! Every status transition on a CertificateRequest is mirrored as an Event so it shows
//! up in `kubectl describe`. Publishing is fire-and-forget: a failed Event is logged
//! and never fails the reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

use crate::constants::CONTROLLER_NAME;

/// Action recorded on every Event emitted by the controller
pub const EVENT_ACTION: &str = "Reconcile";

#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        message: &str,
    );
}

/// Publishes Events through `kube::runtime::events::Recorder`
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventRecorder").finish_non_exhaustive()
    }
}

impl KubeEventRecorder {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        message: &str,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: EVENT_ACTION.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, error = %e, "Failed to publish Kubernetes event");
        }
    }
}
