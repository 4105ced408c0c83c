//! # DigiCert Issuer Controller
//!
//! Signs cert-manager CertificateRequests through DigiCert CertCentral.
//!
//! Configuration comes from environment variables, overridden by command-line flags
//! (see `--help`).

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use digicert_issuer::config::{Cli, ControllerConfig};
use digicert_issuer::controller::provisioner::Provisioners;
use digicert_issuer::runtime::initialization::initialize;
use digicert_issuer::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().apply(ControllerConfig::from_env());

    // Filled by the issuer controller as issuers become Ready.
    let provisioners = Arc::new(Provisioners::new());

    let init = initialize(config, provisioners).await?;
    run_watch_loop(init.client, init.reconciler, init.server_state).await
}
