//! # Runtime
//!
//! - `initialization`: process start-up
//! - `watch_loop`: the controller loop and per-reconciliation wrapper
//! - `error_policy`: retry scheduling of failed reconciliations

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
