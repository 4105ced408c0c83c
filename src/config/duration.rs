//! # Duration Parsing
//!
//! Kubernetes style duration strings: `30s`, `1m`, `5m`, `1h`, `1d`.

use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$")
        .expect("duration regex is valid - this should never happen")
});

/// Parse a Kubernetes duration string into a `Duration`.
///
/// The number must be greater than zero; units are case insensitive.
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let trimmed = duration_str.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Duration string cannot be empty"));
    }

    let lower = trimmed.to_lowercase();
    let captures = DURATION_REGEX.captures(&lower).ok_or_else(|| {
        anyhow!("Invalid duration format '{trimmed}'. Expected format: <number><unit> (e.g., '10s', '5m', '1h')")
    })?;

    let number: u64 = captures["number"]
        .parse()
        .map_err(|e| anyhow!("Invalid duration number in '{trimmed}': {e}"))?;
    if number == 0 {
        return Err(anyhow!(
            "Duration number must be greater than 0, got '{trimmed}'"
        ));
    }

    let multiplier = match &captures["unit"] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => 86400,
    };
    number
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("Duration '{trimmed}' is too large"))
}
