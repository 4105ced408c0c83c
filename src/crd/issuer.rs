//! # DigiCert Issuers
//!
//! `DigicertIssuer` (namespaced) and `ClusterDigicertIssuer` (cluster-scoped) from
//! `certmanager.cloud.sap/v1beta1`. Both carry the same provisioner configuration; their
//! readiness is maintained by the issuer controller and only read here.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use crate::crd::Condition;

/// Namespaced DigiCert issuer
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "certmanager.cloud.sap",
    version = "v1beta1",
    kind = "DigicertIssuer",
    namespaced,
    status = "DigicertIssuerStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DigicertIssuerSpec {
    pub provisioner: DigicertProvisioner,
}

/// Cluster-scoped DigiCert issuer, usable from every namespace
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    group = "certmanager.cloud.sap",
    version = "v1beta1",
    kind = "ClusterDigicertIssuer",
    status = "DigicertIssuerStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDigicertIssuerSpec {
    pub provisioner: DigicertProvisioner,
}

/// How to reach and authenticate against DigiCert CertCentral
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigicertProvisioner {
    /// CertCentral API URL. Defaults to the public CertCentral endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Secret holding the CertCentral API token
    #[serde(rename = "apiTokenReference")]
    pub api_token_reference: SecretKeySelector,
    #[serde(default, rename = "caCertID", skip_serializing_if = "Option::is_none")]
    pub ca_cert_id: Option<String>,
    #[serde(default, rename = "organizationID", skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organization_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_years: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_renewal_notifications: Option<bool>,
    /// Skip the CertCentral approval step for orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// CertCentral product, e.g. `ssl_plus`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default, rename = "containerID", skip_serializing_if = "Option::is_none")]
    pub container_id: Option<i64>,
}

/// Reference to a key of a Secret in the issuer's namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DigicertIssuerStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
