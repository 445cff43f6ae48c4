//! Deterministic serialization used as hashing input.

use handoff_core::{ContextPackage, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Top-level fields that never take part in the canonical form.
pub const EXCLUDED_FIELDS: [&str; 2] = ["checksum", "signature"];

/// Sort object keys recursively. Array order is meaningful and kept.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact serialization of an already canonical value.
pub fn canonical_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// The canonical value of a package, without its checksum or signature.
pub fn canonical_package(package: &ContextPackage) -> Result<Value> {
    let mut value = serde_json::to_value(package)?;
    strip_excluded(&mut value);
    Ok(canonicalize(&value))
}

pub(crate) fn strip_excluded(value: &mut Value) {
    if let Value::Object(map) = value {
        for field in EXCLUDED_FIELDS {
            map.remove(field);
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
