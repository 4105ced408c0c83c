//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of the issuer resources this controller serves.
/// CertificateRequests whose `issuerRef.group` differs belong to another controller.
pub const ISSUER_GROUP: &str = "certmanager.cloud.sap";

/// Kind name of the cluster-scoped issuer.
pub const CLUSTER_ISSUER_KIND: &str = "ClusterDigicertIssuer";

/// Kind name of the namespaced issuer.
pub const ISSUER_KIND: &str = "DigicertIssuer";

/// Condition type used on both issuers and CertificateRequests.
pub const CONDITION_READY: &str = "Ready";

/// Marks a CertificateRequest as acquired by this controller.
pub const ANNOTATION_ACQUIRED: &str = "certmanager.cloud.sap/digicert-issuer";

/// DigiCert order id of the request's order.
pub const ANNOTATION_ORDER_ID: &str = "certmanager.cloud.sap/digicert-order-id";

/// DigiCert certificate id assigned to the request's order.
pub const ANNOTATION_CERT_ID: &str = "certmanager.cloud.sap/digicert-cert-id";

/// Set by cert-manager on requests created for a Certificate.
pub const ANNOTATION_CERTIFICATE_NAME: &str = "cert-manager.io/certificate-name";

/// Set by cert-manager on requests created for a Certificate.
pub const ANNOTATION_PRIVATE_KEY_SECRET_NAME: &str = "cert-manager.io/private-key-secret-name";

/// Reporting component name on emitted Events.
pub const CONTROLLER_NAME: &str = "certificateRequestController";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default requeue delay while the issuer or its provisioner is not ready
pub const DEFAULT_BACKOFF_PROVISIONER_NOT_READY: &str = "10s";

/// Default requeue delay while a DigiCert order is pending
pub const DEFAULT_BACKOFF_REQUEST_PENDING: &str = "5m";

/// Default upper bound for a single reconciliation
pub const DEFAULT_RECONCILE_TIMEOUT: &str = "2m";

/// Default namespace used for the issuer fallback lookup when `POD_NAMESPACE` is unset
pub const DEFAULT_PROVISIONER_NAMESPACE: &str = "kube-system";

/// Default error backoff bounds (seconds) for reconciliations that fail without
/// asking for a specific requeue delay
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Default maximum number of concurrent reconciliations
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;
