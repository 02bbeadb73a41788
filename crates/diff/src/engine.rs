//! Recursive tree diff.

use kubetrail_core::{join_pointer, PatchOperation, SENSITIVE_KIND};
use serde_json::{Map, Value};

use crate::noise::exclude_noise;
use crate::redact::redact_sensitive;

/// Diff two snapshots of a resource.
///
/// Both trees are noise-filtered, and for Secrets both are redacted, before
/// diffing, so only genuine changes surface. Either side may be absent; a
/// JSON `null` is treated the same as an absent node.
///
/// Operations come out in traversal order. Callers may rely on the set of
/// operations being complete, not on their order.
pub fn compute_diff(old: Option<&Value>, new: Option<&Value>, kind: &str) -> Vec<PatchOperation> {
    let old = old.map(|tree| prepare(tree, kind));
    let new = new.map(|tree| prepare(tree, kind));

    let mut ops = Vec::new();
    diff_node(old.as_ref(), new.as_ref(), "", &mut ops);
    ops
}

/// Noise-filtered, redacted copy of an object, as stored for DELETE events.
pub fn filtered_snapshot(tree: &Value, kind: &str) -> Value {
    prepare(tree, kind)
}

fn prepare(tree: &Value, kind: &str) -> Value {
    let mut filtered = exclude_noise(tree, "");
    if kind == SENSITIVE_KIND {
        redact_sensitive(&mut filtered);
    }
    filtered
}

fn present(node: Option<&Value>) -> Option<&Value> {
    node.filter(|v| !v.is_null())
}

fn diff_node(old: Option<&Value>, new: Option<&Value>, path: &str, ops: &mut Vec<PatchOperation>) {
    match (present(old), present(new)) {
        (None, None) => {}
        (None, Some(new)) => ops.push(PatchOperation::add(path, new.clone())),
        (Some(_), None) => ops.push(PatchOperation::remove(path)),
        (Some(Value::Object(old)), Some(Value::Object(new))) => diff_maps(old, new, path, ops),
        // Sequences are replaced whole, never element-diffed.
        (Some(old), Some(new)) => {
            if old != new {
                ops.push(PatchOperation::replace(path, new.clone()));
            }
        }
    }
}

fn diff_maps(old: &Map<String, Value>, new: &Map<String, Value>, path: &str, ops: &mut Vec<PatchOperation>) {
    for (key, old_child) in old {
        let child_path = join_pointer(path, key);
        match new.get(key) {
            None => ops.push(PatchOperation::remove(child_path)),
            Some(new_child) if new_child != old_child => {
                diff_node(Some(old_child), Some(new_child), &child_path, ops)
            }
            Some(_) => {}
        }
    }
    for (key, new_child) in new {
        if !old.contains_key(key) {
            ops.push(PatchOperation::add(join_pointer(path, key), new_child.clone()));
        }
    }
}
