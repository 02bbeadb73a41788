//! Removal of sub-trees the API server rewrites on every write.

use kubetrail_core::join_pointer;
use serde_json::{Map, Value};

/// Exact paths that are always dropped.
const NOISE_PATHS: &[&str] = &[
    "/metadata/managedFields",
    "/metadata/resourceVersion",
    "/metadata/generation",
    "/metadata/creationTimestamp",
    "/metadata/annotations/kubectl.kubernetes.io~1last-applied-configuration",
];

/// Whether a pointer path falls inside an excluded sub-tree.
pub fn is_noise_path(path: &str) -> bool {
    NOISE_PATHS.contains(&path)
        || path == "/status"
        || path.starts_with("/status/")
        || path.starts_with("/metadata/managedFields/")
}

/// Copy `tree` without any node whose path (relative to the document root,
/// with `prefix` being the path of `tree` itself) is noise.
///
/// The node at `prefix` is always kept; only its descendants are filtered.
pub fn exclude_noise(tree: &Value, prefix: &str) -> Value {
    match tree {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let path = join_pointer(prefix, key);
                if is_noise_path(&path) {
                    continue;
                }
                out.insert(key.clone(), exclude_noise(child, &path));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .filter_map(|(i, child)| {
                    let path = format!("{}/{}", prefix, i);
                    (!is_noise_path(&path)).then(|| exclude_noise(child, &path))
                })
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}
