//! Common test utilities for reconciliation tests
//!
//! In-memory stand-ins for the Kubernetes API, Event recorder, metrics sink and
//! DigiCert provisioner, plus builders for the resources they hold.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use digicert_issuer::config::ControllerConfig;
use digicert_issuer::constants::{
    ANNOTATION_ACQUIRED, ANNOTATION_CERTIFICATE_NAME, ANNOTATION_ORDER_ID,
    ANNOTATION_PRIVATE_KEY_SECRET_NAME, CONDITION_READY, ISSUER_GROUP,
};
use digicert_issuer::controller::client::{
    CertificateRequestClient, IssuerClient, ObjectKey, StoreError,
};
use digicert_issuer::controller::events::EventRecorder;
use digicert_issuer::controller::issuer::{Issuer, IssuerScope};
use digicert_issuer::controller::provisioner::{
    DownloadedCertificate, Provisioner, ProvisionerError, Provisioners, SignedCertificate,
};
use digicert_issuer::controller::reconciler::Reconciler;
use digicert_issuer::crd::{
    reasons, CertificateRequest, CertificateRequestSpec, ClusterDigicertIssuer,
    ClusterDigicertIssuerSpec, Condition, ConditionStatus, DigicertIssuer, DigicertIssuerSpec,
    DigicertIssuerStatus, DigicertProvisioner, IssuerRef,
};
use digicert_issuer::observability::{MetricsSink, RequestLabels};

pub const NAMESPACE: &str = "team-a";
pub const DEFAULT_NAMESPACE: &str = "kube-system";
pub const ISSUER_NAME: &str = "digicert";
pub const CERT_PEM: &[u8] = b"-----BEGIN CERTIFICATE-----\nleaf\n-----END CERTIFICATE-----\n";
pub const CA_PEM: &[u8] = b"-----BEGIN CERTIFICATE-----\nca\n-----END CERTIFICATE-----\n";

// ---------------------------------------------------------------------------
// Kubernetes API
// ---------------------------------------------------------------------------

/// CertificateRequests held as JSON and updated with real merge-patch semantics
#[derive(Default)]
pub struct FakeRequests {
    objects: Mutex<HashMap<ObjectKey, Value>>,
    object_patches: Mutex<Vec<Value>>,
    status_patches: Mutex<Vec<Value>>,
    fail_object_patch: AtomicBool,
    fail_status_patch: AtomicBool,
}

impl FakeRequests {
    pub fn insert(&self, request: &CertificateRequest) -> ObjectKey {
        let key = ObjectKey::from_resource(request);
        let value = serde_json::to_value(request).unwrap();
        self.objects.lock().unwrap().insert(key.clone(), value);
        key
    }

    pub fn remove(&self, key: &ObjectKey) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn get(&self, key: &ObjectKey) -> CertificateRequest {
        let value = self.objects.lock().unwrap().get(key).cloned().unwrap();
        serde_json::from_value(value).unwrap()
    }

    pub fn object_patches(&self) -> Vec<Value> {
        self.object_patches.lock().unwrap().clone()
    }

    pub fn status_patches(&self) -> Vec<Value> {
        self.status_patches.lock().unwrap().clone()
    }

    pub fn fail_object_patches(&self) {
        self.fail_object_patch.store(true, Ordering::SeqCst);
    }

    pub fn fail_status_patches(&self) {
        self.fail_status_patch.store(true, Ordering::SeqCst);
    }

    fn apply(&self, key: &ObjectKey, patch: &Value) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().unwrap();
        let object = objects.get_mut(key).ok_or_else(|| StoreError::NotFound {
            kind: "CertificateRequest",
            key: key.clone(),
        })?;
        json_patch::merge(object, patch);
        Ok(())
    }
}

#[async_trait]
impl CertificateRequestClient for FakeRequests {
    async fn get_request(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<CertificateRequest>, StoreError> {
        let value = self.objects.lock().unwrap().get(key).cloned();
        Ok(value
            .map(serde_json::from_value::<CertificateRequest>)
            .transpose()?)
    }

    async fn patch_request(&self, key: &ObjectKey, patch: &Value) -> Result<(), StoreError> {
        if self.fail_object_patch.load(Ordering::SeqCst) {
            return Err(StoreError::NotFound {
                kind: "CertificateRequest",
                key: key.clone(),
            });
        }
        self.object_patches.lock().unwrap().push(patch.clone());
        let mut patch = patch.clone();
        if let Some(map) = patch.as_object_mut() {
            map.remove("status");
        }
        self.apply(key, &patch)
    }

    async fn patch_request_status(
        &self,
        key: &ObjectKey,
        patch: &Value,
    ) -> Result<(), StoreError> {
        if self.fail_status_patch.load(Ordering::SeqCst) {
            return Err(StoreError::NotFound {
                kind: "CertificateRequest",
                key: key.clone(),
            });
        }
        self.status_patches.lock().unwrap().push(patch.clone());
        let status_only = serde_json::json!({ "status": patch["status"].clone() });
        self.apply(key, &status_only)
    }
}

/// Issuers keyed by namespace/name (cluster issuers without namespace)
#[derive(Default)]
pub struct FakeIssuers {
    issuers: Mutex<HashMap<ObjectKey, Arc<dyn Issuer>>>,
    lookups: Mutex<Vec<ObjectKey>>,
}

impl FakeIssuers {
    pub fn insert_namespaced(&self, issuer: DigicertIssuer) -> ObjectKey {
        let key = ObjectKey::from_resource(&issuer);
        self.issuers.lock().unwrap().insert(key.clone(), Arc::new(issuer));
        key
    }

    pub fn insert_cluster(&self, issuer: ClusterDigicertIssuer) -> ObjectKey {
        let key = ObjectKey::from_resource(&issuer);
        self.issuers.lock().unwrap().insert(key.clone(), Arc::new(issuer));
        key
    }

    pub fn lookups(&self) -> Vec<ObjectKey> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssuerClient for FakeIssuers {
    async fn get_issuer(
        &self,
        scope: IssuerScope,
        key: &ObjectKey,
    ) -> Result<Arc<dyn Issuer>, StoreError> {
        self.lookups.lock().unwrap().push(key.clone());
        self.issuers
            .lock()
            .unwrap()
            .get(key)
            .filter(|issuer| issuer.kind() == scope.kind())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: scope.kind(),
                key: key.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Events and metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub warning: bool,
    pub reason: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn all(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> RecordedEvent {
        self.all().pop().unwrap()
    }
}

#[async_trait]
impl EventRecorder for RecordingEvents {
    async fn record(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        message: &str,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricCall {
    IssuerNotReady {
        issuer: String,
        reason: String,
    },
    RequestPending {
        name: String,
        certificate: String,
        secret: String,
        order_id: String,
    },
    RequestError {
        name: String,
        error: String,
    },
}

#[derive(Default)]
pub struct RecordingMetrics {
    calls: Mutex<Vec<MetricCall>>,
}

impl RecordingMetrics {
    pub fn all(&self) -> Vec<MetricCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn increment_issuer_not_ready(&self, issuer: &str, reason: &str) {
        self.calls.lock().unwrap().push(MetricCall::IssuerNotReady {
            issuer: issuer.to_string(),
            reason: reason.to_string(),
        });
    }

    fn increment_request_pending(&self, request: RequestLabels<'_>, order_id: &str) {
        self.calls.lock().unwrap().push(MetricCall::RequestPending {
            name: request.name.to_string(),
            certificate: request.certificate.to_string(),
            secret: request.secret.to_string(),
            order_id: order_id.to_string(),
        });
    }

    fn increment_request_error(&self, request: RequestLabels<'_>, error: &str) {
        self.calls.lock().unwrap().push(MetricCall::RequestError {
            name: request.name.to_string(),
            error: error.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

/// Provisioner answering every call with a fixed result
pub struct FakeProvisioner {
    sign: Result<SignedCertificate, String>,
    download: Result<DownloadedCertificate, String>,
    delay: Option<Duration>,
    sign_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl Default for FakeProvisioner {
    fn default() -> Self {
        Self {
            sign: Err("sign not expected".to_string()),
            download: Err("download not expected".to_string()),
            delay: None,
            sign_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeProvisioner {
    pub fn signing(signed: SignedCertificate) -> Self {
        Self {
            sign: Ok(signed),
            ..Self::default()
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            sign: Err(message.to_string()),
            ..Self::default()
        }
    }

    pub fn downloading(download: Result<DownloadedCertificate, String>) -> Self {
        Self {
            download,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn sign(&self, _request: &CertificateRequest) -> Result<SignedCertificate, ProvisionerError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.sign.clone().map_err(ProvisionerError::Rejected)
    }

    async fn download(
        &self,
        _request: &CertificateRequest,
    ) -> Result<DownloadedCertificate, ProvisionerError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.download.clone().map_err(ProvisionerError::Api)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub requests: Arc<FakeRequests>,
    pub issuers: Arc<FakeIssuers>,
    pub events: Arc<RecordingEvents>,
    pub metrics: Arc<RecordingMetrics>,
    pub provisioners: Arc<Provisioners>,
    pub reconciler: Arc<Reconciler>,
}

pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        default_provisioner_namespace: DEFAULT_NAMESPACE.to_string(),
        backoff_provisioner_not_ready: Duration::from_secs(10),
        backoff_request_pending: Duration::from_secs(300),
        ..ControllerConfig::default()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let requests = Arc::new(FakeRequests::default());
        let issuers = Arc::new(FakeIssuers::default());
        let events = Arc::new(RecordingEvents::default());
        let metrics = Arc::new(RecordingMetrics::default());
        let provisioners = Arc::new(Provisioners::new());
        let reconciler = Arc::new(Reconciler::with_parts(
            requests.clone(),
            issuers.clone(),
            events.clone(),
            provisioners.clone(),
            metrics.clone(),
            config,
        ));
        Self {
            requests,
            issuers,
            events,
            metrics,
            provisioners,
            reconciler,
        }
    }

    pub fn register(&self, issuer: ObjectKey, provisioner: FakeProvisioner) -> Arc<FakeProvisioner> {
        let provisioner = Arc::new(provisioner);
        self.provisioners.store(issuer, provisioner.clone());
        provisioner
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A fresh request in [`NAMESPACE`] for a `DigicertIssuer` or `ClusterDigicertIssuer`
pub fn certificate_request(name: &str, issuer_kind: &str) -> CertificateRequest {
    let mut request = CertificateRequest::new(
        name,
        CertificateRequestSpec {
            request: "LS0tLS1CRUdJTiBDRVJUSUZJQ0FURSBSRVFVRVNULS0tLS0K".to_string(),
            issuer_ref: IssuerRef {
                name: ISSUER_NAME.to_string(),
                kind: issuer_kind.to_string(),
                group: ISSUER_GROUP.to_string(),
            },
            ..CertificateRequestSpec::default()
        },
    );
    request.metadata.namespace = Some(NAMESPACE.to_string());
    request.metadata.annotations = Some(BTreeMap::from([
        (ANNOTATION_CERTIFICATE_NAME.to_string(), "web".to_string()),
        (ANNOTATION_PRIVATE_KEY_SECRET_NAME.to_string(), "web-tls".to_string()),
    ]));
    request
}

/// A request whose order `order_id` was placed earlier and is awaiting approval
pub fn pending_request(name: &str, issuer_kind: &str, order_id: &str) -> CertificateRequest {
    let mut request = certificate_request(name, issuer_kind);
    let annotations = request.metadata.annotations.get_or_insert_with(BTreeMap::new);
    annotations.insert(ANNOTATION_ACQUIRED.to_string(), "true".to_string());
    annotations.insert(ANNOTATION_ORDER_ID.to_string(), order_id.to_string());
    request.set_ready_condition(
        ConditionStatus::False,
        reasons::PENDING,
        "Certificate request pending",
        "2024-05-01T10:00:00Z",
    );
    request
}

fn issuer_status(ready: bool) -> DigicertIssuerStatus {
    let status = if ready {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    DigicertIssuerStatus {
        conditions: vec![Condition::new(CONDITION_READY, status, "Verified", "")],
    }
}

pub fn namespaced_issuer(namespace: &str, ready: bool) -> DigicertIssuer {
    let mut issuer = DigicertIssuer::new(
        ISSUER_NAME,
        DigicertIssuerSpec {
            provisioner: DigicertProvisioner::default(),
        },
    );
    issuer.metadata.namespace = Some(namespace.to_string());
    issuer.status = Some(issuer_status(ready));
    issuer
}

pub fn cluster_issuer(ready: bool) -> ClusterDigicertIssuer {
    let mut issuer = ClusterDigicertIssuer::new(
        ISSUER_NAME,
        ClusterDigicertIssuerSpec {
            provisioner: DigicertProvisioner::default(),
        },
    );
    issuer.status = Some(issuer_status(ready));
    issuer
}
