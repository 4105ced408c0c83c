//! # Reconciler
//!
//! Reconciliation of cert-manager `CertificateRequest` resources that reference a
//! DigiCert issuer.
//!
//! ## Reconciliation Flow
//!
//! 1. Fetch the request; skip foreign issuer groups and issued requests
//! 2. Resolve the issuer, falling back to the default provisioner namespace
//! 3. Gate on issuer readiness and a registered provisioner
//! 4. Poll a pending order, or place a new one and record its ids
//! 5. Write the `Ready` condition, certificate and CA, and emit an Event

pub mod reconcile;
pub mod status;
pub mod types;

pub use reconcile::needs_reconcile;
pub use types::{ReconcileOutcome, Reconciler, ReconcilerError};
