//! # Initialization
//!
//! Start-up of the controller process: rustls, tracing, metrics, probe server and the
//! Kubernetes client.

use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::ControllerConfig;
use crate::controller::provisioner::ProvisionerRegistry;
use crate::controller::reconciler::Reconciler;
use crate::observability;
use crate::server::{start_server, ServerState};

pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime.
///
/// `provisioners` is the registry shared with the issuer controller.
pub async fn initialize(
    config: ControllerConfig,
    provisioners: Arc<dyn ProvisionerRegistry>,
) -> Result<InitializationResult> {
    // Must run before any TLS connection is opened.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("rustls crypto provider already installed");
    }

    observability::init_tracing(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        build = env!("BUILD_GIT_HASH"),
        built_at = env!("BUILD_DATETIME"),
        "Starting DigiCert issuer controller"
    );
    info!(
        default_provisioner_namespace = %config.default_provisioner_namespace,
        backoff_provisioner_not_ready = ?config.backoff_provisioner_not_ready,
        backoff_request_pending = ?config.backoff_request_pending,
        disable_root_ca = config.disable_root_ca,
        "Loaded configuration"
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let state = server_state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, state).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let reconciler = Arc::new(Reconciler::new(client.clone(), provisioners, config));

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}
