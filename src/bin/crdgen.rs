//! # CRD Generator
//!
//! Prints the `DigicertIssuer` and `ClusterDigicertIssuer` CustomResourceDefinitions
//! as a multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/issuers.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```
//!
//! `CertificateRequest` belongs to cert-manager and is not generated here.

use digicert_issuer::crd::{ClusterDigicertIssuer, DigicertIssuer};
use kube::core::CustomResourceExt;

fn main() {
    for crd in [DigicertIssuer::crd(), ClusterDigicertIssuer::crd()] {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => print!("---\n{yaml}"),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
