//! One-way hashing of sensitive payload values.
//!
//! Every leaf under a `data` or `stringData` key is replaced with
//! `sha256:<hex>`. Identical plaintext hashes identically, so an unchanged
//! secret value never shows up in a diff while its content never leaves
//! the process.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

const SENSITIVE_KEYS: &[&str] = &["data", "stringData"];

/// Marker hashed in place of a leaf that could not be encoded.
const UNHASHABLE_MARKER: &str = "<kubetrail:unhashable-value>";

/// Hash a single leaf value.
///
/// Strings hash their UTF-8 bytes; anything else hashes its JSON encoding.
pub fn hash_leaf(value: &Value) -> String {
    match value {
        Value::String(s) => hash_bytes(s.as_bytes()),
        other => hash_serialized(other),
    }
}

/// Hash the JSON encoding of any serializable value.
///
/// Encoding failures (e.g. a map with non-string keys) degrade to hashing a
/// fixed marker instead of erroring.
pub fn hash_serialized<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(encoded) => hash_bytes(&encoded),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode sensitive value, hashing marker");
            hash_bytes(UNHASHABLE_MARKER.as_bytes())
        }
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// Replace every leaf beneath a `data` / `stringData` key with its hash.
pub fn redact_sensitive(tree: &mut Value) {
    match tree {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if SENSITIVE_KEYS.contains(&key.as_str()) {
                    hash_section(child);
                } else {
                    redact_sensitive(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_sensitive),
        _ => {}
    }
}

fn hash_section(section: &mut Value) {
    match section {
        Value::Object(entries) => {
            for leaf in entries.values_mut() {
                *leaf = Value::String(hash_leaf(leaf));
            }
        }
        Value::Null => {}
        other => *other = Value::String(hash_leaf(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_sha256_marker(v: &Value) -> bool {
        v.as_str()
            .and_then(|s| s.strip_prefix("sha256:"))
            .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            hash_leaf(&json!("hello")),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn hashes_data_and_string_data() {
        let mut secret = json!({
            "metadata": {"name": "db"},
            "type": "Opaque",
            "data": {"password": "c2VjcmV0"},
            "stringData": {"user": "admin"}
        });
        redact_sensitive(&mut secret);
        assert!(is_sha256_marker(&secret["data"]["password"]));
        assert!(is_sha256_marker(&secret["stringData"]["user"]));
        assert_eq!(secret["metadata"]["name"], "db");
        assert_eq!(secret["type"], "Opaque");
    }

    #[test]
    fn non_string_leaves_hash_their_json_encoding() {
        let mut tree = json!({"data": {"n": 1, "nested": {"a": true}}});
        redact_sensitive(&mut tree);
        assert_eq!(tree["data"]["n"], json!(hash_leaf(&json!(1))));
        assert_eq!(tree["data"]["nested"], json!(hash_leaf(&json!({"a": true}))));
    }

    #[test]
    fn unencodable_values_hash_the_marker() {
        use std::collections::BTreeMap;

        let byte_keyed = BTreeMap::from([(vec![1u8, 2], "v")]);
        let hashed = hash_serialized(&byte_keyed);
        assert_eq!(hashed, hash_bytes(UNHASHABLE_MARKER.as_bytes()));
        assert!(is_sha256_marker(&json!(hashed)));

        let string_keyed = BTreeMap::from([("k", "v")]);
        assert_eq!(hash_serialized(&string_keyed), hash_leaf(&json!({"k": "v"})));
    }

    #[test]
    fn identical_values_hash_identically() {
        let mut a = json!({"data": {"k": "v"}});
        let mut b = json!({"data": {"k": "v"}});
        redact_sensitive(&mut a);
        redact_sensitive(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn nested_data_keys_are_redacted() {
        let mut tree = json!({"items": [{"data": {"token": "abc"}}]});
        redact_sensitive(&mut tree);
        assert!(is_sha256_marker(&tree["items"][0]["data"]["token"]));
    }
}
