//! Canonical JSON serialization.
//!
//! Snapshot documents are hashed into anchor roots; two byte-identical
//! documents must always hash identically, so serialization here is fully
//! deterministic:
//!
//! 1. Object keys sorted lexicographically (UTF-8 byte order)
//! 2. Compact output, no incidental whitespace
//! 3. Null-valued fields omitted
//! 4. Whole-valued floats rendered as integers

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalJsonError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CanonicalJsonError>;

/// Serialize a value to its canonical JSON string.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let json_value = serde_json::to_value(value)?;
    let canonical = canonicalize_value(json_value);
    Ok(serde_json::to_string(&canonical)?)
}

/// Canonical UTF-8 bytes of a value; the input to the anchor-root hash.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(to_canonical_json(value)?.into_bytes())
}

/// SHA-256 over the canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<[u8; 32]> {
    let bytes = to_canonical_bytes(value)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.into())
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (k, v) in map {
                // Null fields are omitted from the canonical form.
                if !v.is_null() {
                    sorted.insert(k, canonicalize_value(v));
                }
            }

            let mut canonical_map = Map::new();
            for (k, v) in sorted {
                canonical_map.insert(k, v);
            }

            Value::Object(canonical_map)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize_value).collect()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < (1u64 << 53) as f64 {
                    Value::Number(serde_json::Number::from(f as i64))
                } else {
                    Value::Number(serde_json::Number::from_f64(f).unwrap_or(n))
                }
            } else {
                Value::Number(n)
            }
        }
        other => other,
    }
}
