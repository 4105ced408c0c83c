//! # CertificateRequest
//!
//! The subset of cert-manager's `CertificateRequest` (`cert-manager.io/v1`) that the
//! controller reads and writes. Unknown fields are dropped on deserialization, which is
//! safe because every write is a merge patch of the fields modelled here.

use crate::constants::{ANNOTATION_ACQUIRED, CONDITION_READY};
use crate::crd::condition::{upsert_condition, Condition, ConditionStatus};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Reasons of the `Ready` condition on a CertificateRequest, as defined by cert-manager
pub mod reasons {
    pub const PENDING: &str = "Pending";
    pub const ISSUED: &str = "Issued";
    pub const FAILED: &str = "Failed";
}

/// Request for a signed certificate from the referenced issuer
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "CertificateRequest",
    namespaced,
    status = "CertificateRequestStatus",
    shortname = "cr",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Issuer", "type":"string", "jsonPath":".spec.issuerRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestSpec {
    /// PEM encoded CSR, base64 encoded on the wire. Immutable after creation.
    pub request: String,
    /// Issuer that should sign the request
    pub issuer_ref: IssuerRef,
    /// Requested certificate lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, rename = "isCA", skip_serializing_if = "Option::is_none")]
    pub is_ca: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<Vec<String>>,
}

/// Reference to the issuer of a CertificateRequest
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Issued certificate, base64 encoded PEM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// CA chain of the issued certificate, base64 encoded PEM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    /// Time the request was marked Failed (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_time: Option<String>,
}

impl CertificateRequest {
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations().get(key).map(String::as_str)
    }

    /// Whether `status.certificate` carries an issued certificate.
    #[must_use]
    pub fn has_certificate(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.certificate.as_deref())
            .is_some_and(|c| !c.is_empty())
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions()
            .iter()
            .find(|c| c.r#type == CONDITION_READY)
    }

    /// Whether this controller already placed an order for the request.
    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.annotation(ANNOTATION_ACQUIRED) == Some("true")
    }

    /// Decoded `status.certificate`.
    #[must_use]
    pub fn certificate_pem(&self) -> Option<Vec<u8>> {
        self.status
            .as_ref()
            .and_then(|s| s.certificate.as_deref())
            .and_then(|c| STANDARD.decode(c).ok())
    }

    /// Decoded `status.ca`.
    #[must_use]
    pub fn ca_pem(&self) -> Option<Vec<u8>> {
        self.status
            .as_ref()
            .and_then(|s| s.ca.as_deref())
            .and_then(|c| STANDARD.decode(c).ok())
    }

    pub fn set_certificate(&mut self, pem: &[u8]) {
        self.status_mut().certificate = Some(STANDARD.encode(pem));
    }

    pub fn set_ca(&mut self, pem: &[u8]) {
        self.status_mut().ca = Some(STANDARD.encode(pem));
    }

    /// Replace the `Ready` condition. Marks `failureTime` the first time the
    /// request is reported as Failed.
    pub fn set_ready_condition(
        &mut self,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: &str,
    ) {
        let status_block = self.status_mut();
        upsert_condition(
            &mut status_block.conditions,
            Condition::new(CONDITION_READY, status, reason, message),
            now,
        );
        if reason == reasons::FAILED && status_block.failure_time.is_none() {
            status_block.failure_time = Some(now.to_string());
        }
    }

    fn status_mut(&mut self) -> &mut CertificateRequestStatus {
        self.status.get_or_insert_with(CertificateRequestStatus::default)
    }
}
