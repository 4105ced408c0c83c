//! # Conditions
//!
//! Status conditions shared by CertificateRequests and issuers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state value of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (only `Ready` is used by this controller)
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Machine readable reason, e.g. `Pending`, `Issued`, `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Last time the status value changed (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    #[must_use]
    pub fn new(r#type: &str, status: ConditionStatus, reason: &str, message: &str) -> Self {
        Self {
            r#type: r#type.to_string(),
            status,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            last_transition_time: None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }
}

/// Replace the condition of the same type, or append it.
///
/// `lastTransitionTime` is carried over when the status value is unchanged and
/// stamped with `now` otherwise.
pub(crate) fn upsert_condition(conditions: &mut Vec<Condition>, mut condition: Condition, now: &str) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) => {
            condition.last_transition_time = if existing.status == condition.status {
                existing
                    .last_transition_time
                    .clone()
                    .or_else(|| Some(now.to_string()))
            } else {
                Some(now.to_string())
            };
            *existing = condition;
        }
        None => {
            condition.last_transition_time = Some(now.to_string());
            conditions.push(condition);
        }
    }
}
