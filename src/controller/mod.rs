//! # Controller
//!
//! Core controller modules.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `client`: Kubernetes access behind traits
//! - `events`: Kubernetes Event recording
//! - `issuer`: Issuer trait and resolution with namespace fallback
//! - `patch`: JSON merge patch computation
//! - `provisioner`: DigiCert provisioner trait and registry
//! - `reconciler`: CertificateRequest state machine

pub mod backoff;
pub mod client;
pub mod events;
pub mod issuer;
pub mod patch;
pub mod provisioner;
pub mod reconciler;
