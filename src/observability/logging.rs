//! # Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` wins when set; otherwise the
//! configured log level applies to this crate only.

use tracing_subscriber::EnvFilter;

use crate::config::ControllerConfig;

/// Initialise the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(config: &ControllerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.log_level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.log_format.eq_ignore_ascii_case("text") {
        builder.try_init()
    } else {
        builder.json().flatten_event(true).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

fn default_filter(level: &str) -> String {
    format!("digicert_issuer={}", level.to_lowercase())
}
