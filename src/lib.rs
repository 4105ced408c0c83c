//! DigiCert Issuer Controller Library
//!
//! Reconciles cert-manager `CertificateRequest` resources addressed to a
//! `DigicertIssuer` or `ClusterDigicertIssuer` by placing and polling DigiCert
//! CertCentral orders through the issuer's provisioner.
//!
//! - `config`: environment and command-line configuration
//! - `constants`: API group, annotation keys and defaults
//! - `controller`: reconciliation state machine and its Kubernetes seams
//! - `crd`: resource types
//! - `observability`: metrics and logging
//! - `runtime`: controller start-up, watch loop and error policy
//! - `server`: metrics and probe endpoints

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;
pub mod server;
