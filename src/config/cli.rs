//! # Command-line Flags
//!
//! Flags take precedence over the environment.

use clap::Parser;

use crate::config::controller::parse_bool;
use crate::config::duration::parse_kubernetes_duration;
use crate::config::ControllerConfig;

/// DigiCert issuer controller for cert-manager CertificateRequests
#[derive(Debug, Default, Parser)]
#[command(name = "digicert-issuer", version, about)]
pub struct Cli {
    /// Namespace searched for a DigicertIssuer not found in the request's namespace
    #[arg(long)]
    pub default_provisioner_namespace: Option<String>,

    /// Requeue delay while the issuer or provisioner is not ready (e.g. 10s)
    #[arg(long, value_parser = parse_kubernetes_duration)]
    pub backoff_provisioner_not_ready: Option<std::time::Duration>,

    /// Requeue delay while a DigiCert order is pending (e.g. 5m)
    #[arg(long, value_parser = parse_kubernetes_duration)]
    pub backoff_request_pending: Option<std::time::Duration>,

    /// Do not propagate the CA chain into CertificateRequest status
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_flag)]
    pub disable_root_ca: Option<bool>,

    /// Port of the metrics and probe server
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(parse_bool(value))
}

impl Cli {
    /// Apply the flags that were given on top of `config`.
    #[must_use]
    pub fn apply(self, mut config: ControllerConfig) -> ControllerConfig {
        if let Some(namespace) = self.default_provisioner_namespace {
            config.default_provisioner_namespace = namespace;
        }
        if let Some(backoff) = self.backoff_provisioner_not_ready {
            config.backoff_provisioner_not_ready = backoff;
        }
        if let Some(backoff) = self.backoff_request_pending {
            config.backoff_request_pending = backoff;
        }
        if let Some(disable) = self.disable_root_ca {
            config.disable_root_ca = disable;
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        config
    }
}
