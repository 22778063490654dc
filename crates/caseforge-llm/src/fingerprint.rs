//! Request fingerprinting for the response cache.
//!
//! A fingerprint is the SHA-256 of the canonical JSON of the request's
//! semantically relevant fields (target, payload, options). Canonical form
//! sorts object keys recursively and carries no insignificant whitespace,
//! so the digest is independent of field ordering and stable across
//! processes.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::provider::GenerationRequest;

/// Compute the cache fingerprint for a request: lowercase hex SHA-256 of
/// its canonical JSON.
#[must_use]
pub fn fingerprint(request: &GenerationRequest) -> String {
    // GenerationRequest has only string-keyed fields; serialization cannot fail.
    let value = serde_json::to_value(request).unwrap_or(Value::Null);
    let canonical = to_canonical_json(&value);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Render a JSON value in canonical form: object keys sorted recursively,
/// arrays in order, no whitespace.
fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let rendered: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        to_canonical_json(v),
                    )
                })
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
