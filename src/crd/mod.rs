//! # Custom Resource Definitions
//!
//! Resource types the controller reads and writes.
//!
//! ## Module Structure
//!
//! - `certificate_request.rs` - cert-manager `CertificateRequest` (the reconciled object)
//! - `issuer.rs` - `DigicertIssuer` and `ClusterDigicertIssuer` (read-only here)
//! - `condition.rs` - Condition type shared by requests and issuers

mod certificate_request;
mod condition;
mod issuer;

pub use certificate_request::{
    reasons, CertificateRequest, CertificateRequestSpec, CertificateRequestStatus, IssuerRef,
};
pub use condition::{Condition, ConditionStatus};
pub use issuer::{
    ClusterDigicertIssuer, ClusterDigicertIssuerSpec, DigicertIssuer, DigicertIssuerSpec,
    DigicertIssuerStatus, DigicertProvisioner, SecretKeySelector,
};
