//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;
use tracing::warn;

use crate::config::duration::parse_kubernetes_duration;
use crate::constants::{
    DEFAULT_BACKOFF_PROVISIONER_NOT_READY, DEFAULT_BACKOFF_REQUEST_PENDING,
    DEFAULT_ERROR_BACKOFF_MAX_SECS, DEFAULT_ERROR_BACKOFF_MIN_SECS,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_METRICS_PORT, DEFAULT_PROVISIONER_NAMESPACE,
    DEFAULT_RECONCILE_TIMEOUT,
};

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace searched for a `DigicertIssuer` when it is not found in the
    /// CertificateRequest's own namespace
    pub default_provisioner_namespace: String,
    /// Requeue delay while the issuer or its provisioner is not ready
    pub backoff_provisioner_not_ready: Duration,
    /// Requeue delay while a DigiCert order is pending
    pub backoff_request_pending: Duration,
    /// Do not copy the CA chain into `status.ca`
    pub disable_root_ca: bool,
    /// Upper bound for a single reconciliation including all external calls
    pub reconcile_timeout: Duration,
    /// Error backoff bounds (seconds) for failures without their own requeue delay
    pub error_backoff_min_secs: u64,
    pub error_backoff_max_secs: u64,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: u16,
    /// HTTP port for metrics and probes
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_provisioner_namespace: DEFAULT_PROVISIONER_NAMESPACE.to_string(),
            backoff_provisioner_not_ready: Duration::from_secs(10),
            backoff_request_pending: Duration::from_secs(300),
            disable_root_ca: false,
            reconcile_timeout: Duration::from_secs(120),
            error_backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            error_backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let pod_namespace = env_var_or_default_str("POD_NAMESPACE", DEFAULT_PROVISIONER_NAMESPACE);
        Self {
            default_provisioner_namespace: env_var_or_default_str(
                "DEFAULT_PROVISIONER_NAMESPACE",
                &pod_namespace,
            ),
            backoff_provisioner_not_ready: env_duration_or_default(
                "BACKOFF_PROVISIONER_NOT_READY",
                DEFAULT_BACKOFF_PROVISIONER_NOT_READY,
            ),
            backoff_request_pending: env_duration_or_default(
                "BACKOFF_REQUEST_PENDING",
                DEFAULT_BACKOFF_REQUEST_PENDING,
            ),
            disable_root_ca: env_var_or_default_bool("DISABLE_ROOT_CA", false),
            reconcile_timeout: env_duration_or_default(
                "RECONCILE_TIMEOUT",
                DEFAULT_RECONCILE_TIMEOUT,
            ),
            error_backoff_min_secs: env_var_or_default(
                "ERROR_BACKOFF_MIN_SECS",
                DEFAULT_ERROR_BACKOFF_MIN_SECS,
            ),
            error_backoff_max_secs: env_var_or_default(
                "ERROR_BACKOFF_MAX_SECS",
                DEFAULT_ERROR_BACKOFF_MAX_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        }
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| parse_bool(&v))
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a Kubernetes duration string; invalid values fall back to the default
fn env_duration_or_default(key: &str, default: &str) -> Duration {
    let fallback = || {
        parse_kubernetes_duration(default)
            .unwrap_or_else(|_| Duration::from_secs(DEFAULT_ERROR_BACKOFF_MIN_SECS))
    };
    match std::env::var(key) {
        Ok(value) => parse_kubernetes_duration(&value).unwrap_or_else(|e| {
            warn!("Ignoring invalid {key}={value:?}: {e}; using {default}");
            fallback()
        }),
        Err(_) => fallback(),
    }
}
