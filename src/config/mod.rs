//! # Configuration
//!
//! Controller settings, loaded from environment variables (populated from a
//! ConfigMap via `envFrom`) and optionally overridden by command-line flags.

mod cli;
mod controller;
mod duration;

pub use cli::Cli;
pub use controller::ControllerConfig;
pub use duration::parse_kubernetes_duration;
