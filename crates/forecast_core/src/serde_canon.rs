//! Canonical JSON serialization for reproducible artifacts
//!
//! Object keys are sorted recursively and no whitespace is emitted, so two
//! equal values always produce byte-identical output and the same blake3
//! digest.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanonicalError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Serialize a value to canonical JSON (sorted keys, no whitespace)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let json_value =
        serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    let canonical = canonicalize_value(&json_value);
    serde_json::to_string(&canonical).map_err(|e| CanonicalError::Serialization(e.to_string()))
}

/// Indented canonical JSON for files meant to be read by people
pub fn to_canonical_json_pretty<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let json_value =
        serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    let canonical = canonicalize_value(&json_value);
    serde_json::to_string_pretty(&canonical)
        .map_err(|e| CanonicalError::Serialization(e.to_string()))
}

fn canonicalize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<&String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k, canonicalize_value(v)))
                .collect();
            serde_json::Value::Object(
                sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect(),
            )
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize_value).collect())
        }
        other => other.clone(),
    }
}

/// Blake3 digest of raw bytes as lowercase hex
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Blake3 digest of the canonical JSON representation as lowercase hex
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let json = to_canonical_json(value)?;
    Ok(hash_bytes_hex(json.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        b_field: i64,
        a_field: f64,
        z_field: String,
    }

    fn sample(b: i64) -> Sample {
        Sample {
            b_field: b,
            a_field: 0.5,
            z_field: "x".to_string(),
        }
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let json = to_canonical_json(&sample(2)).unwrap();
        assert_eq!(json, r#"{"a_field":0.5,"b_field":2,"z_field":"x"}"#);
    }

    #[test]
    fn test_pretty_output_has_same_key_order() {
        let pretty = to_canonical_json_pretty(&sample(2)).unwrap();
        let a = pretty.find("a_field").unwrap();
        let z = pretty.find("z_field").unwrap();
        assert!(a < z);
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let h1 = hash_canonical_hex(&sample(2)).unwrap();
        let h2 = hash_canonical_hex(&sample(2)).unwrap();
        let h3 = hash_canonical_hex(&sample(3)).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), 64);
    }
}
