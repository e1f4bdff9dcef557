//! Hashing - SHA-256 for Generation Records
//!
//! Deterministic hashes so identical requests can be recognized and exported
//! rasters verified.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::symbology::Symbology;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Serialize with object keys in byte order at every depth, without
/// whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&canonicalize(serde_json::to_value(value)?))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(key, inner)| (key, canonicalize(inner))).collect();
            Value::Object(ordered.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}

/// job_hash = sha256(symbology:data:canonical_style:engine_version)
pub fn compute_job_hash(
    symbology: Symbology,
    data: &str,
    style: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_style = canonical_json(style)?;
    let combined = format!("{}:{}:{}:{}", symbology, data, canonical_style, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleSpec;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": {"y": 2, "b": 3}, "m": [{"d": 1, "c": 2}]});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":{"b":3,"y":2},"m":[{"c":2,"d":1}],"z":1}"#);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_job_hash_tracks_inputs() {
        let style = StyleSpec::default();
        let h1 = compute_job_hash(Symbology::Ean13, "4006381333931", &style, "1.0.0").unwrap();
        let h2 = compute_job_hash(Symbology::Ean13, "4006381333931", &style, "1.0.0").unwrap();
        assert_eq!(h1, h2);

        let other = compute_job_hash(Symbology::Ean13, "4006381333931", &style, "1.0.1").unwrap();
        assert_ne!(h1, other);

        let mut bigger = StyleSpec::default();
        bigger.size = 400;
        let restyled = compute_job_hash(Symbology::Ean13, "4006381333931", &bigger, "1.0.0").unwrap();
        assert_ne!(h1, restyled);
    }
}
