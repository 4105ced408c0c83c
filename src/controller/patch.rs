//! # Merge Patches
//!
//! The reconciler mutates a working copy of the CertificateRequest and sends only the
//! difference to the snapshot it fetched, as a JSON merge patch (RFC 7386). Metadata
//! and spec go through the main resource, `status` through the status subresource, so
//! each patch is restricted to its half of the object.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::controller::client::StoreError;

/// Merge patch turning `original` into `modified`.
///
/// Keys missing from `modified` become `null`. Arrays and scalars are replaced
/// wholesale. Equal documents yield an empty object.
#[must_use]
pub fn create_merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(original), Value::Object(modified)) => {
            let mut patch = Map::new();
            for key in original.keys() {
                if !modified.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            for (key, value) in modified {
                match original.get(key) {
                    Some(previous) if previous == value => {}
                    Some(previous) if previous.is_object() && value.is_object() => {
                        patch.insert(key.clone(), create_merge_patch(previous, value));
                    }
                    _ => {
                        patch.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(patch)
        }
        _ => modified.clone(),
    }
}

/// Patch for everything except `status`, or `None` when nothing changed.
pub fn object_patch<K: Serialize>(snapshot: &K, working: &K) -> Result<Option<Value>, StoreError> {
    let mut patch = diff(snapshot, working)?;
    if let Value::Object(map) = &mut patch {
        map.remove("status");
    }
    Ok(non_empty(patch))
}

/// Patch for `status` only, or `None` when the status is unchanged.
pub fn status_patch<K: Serialize>(snapshot: &K, working: &K) -> Result<Option<Value>, StoreError> {
    let patch = diff(snapshot, working)?;
    let status = match patch {
        Value::Object(mut map) => map.remove("status"),
        _ => None,
    };
    Ok(status.map(|status| {
        let mut map = Map::new();
        map.insert("status".to_string(), status);
        Value::Object(map)
    }))
}

fn diff<K: Serialize>(snapshot: &K, working: &K) -> Result<Value, StoreError> {
    Ok(create_merge_patch(
        &serde_json::to_value(snapshot)?,
        &serde_json::to_value(working)?,
    ))
}

fn non_empty(patch: Value) -> Option<Value> {
    match &patch {
        Value::Object(map) if map.is_empty() => None,
        _ => Some(patch),
    }
}
