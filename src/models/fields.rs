//! Typed accessors over schema-less resource documents
//!
//! Live resources flow through the engine as `serde_json::Value` documents
//! with no static schema. This module provides accessors for the well-known
//! metadata fields and the dotted-path extraction used by JSONPath matching.

use crate::models::GroupVersionKind;
use serde_json::Value;
use std::collections::BTreeMap;

/// An entry from `metadata.ownerReferences`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// GVK of a live object, from its `apiVersion` and `kind` fields
pub fn object_gvk(obj: &Value) -> Option<GroupVersionKind> {
    let api_version = obj.get("apiVersion")?.as_str()?;
    let kind = obj.get("kind")?.as_str()?;
    Some(GroupVersionKind::from_api_version(api_version, kind))
}

/// `metadata.name` of a live object
pub fn object_name(obj: &Value) -> Option<&str> {
    obj.get("metadata")?.get("name")?.as_str()
}

/// `metadata.namespace` of a live object
pub fn object_namespace(obj: &Value) -> Option<&str> {
    obj.get("metadata")?.get("namespace")?.as_str()
}

/// `metadata.uid` of a live object
pub fn object_uid(obj: &Value) -> Option<&str> {
    obj.get("metadata")?.get("uid")?.as_str()
}

/// `metadata.labels` of a live object; missing labels yield an empty map
pub fn object_labels(obj: &Value) -> BTreeMap<String, String> {
    obj.get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(|l| l.as_object())
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// `metadata.ownerReferences` of a live object.
///
/// Entries missing any of kind/name/uid are dropped.
pub fn owner_references(obj: &Value) -> Vec<OwnerRef> {
    obj.get("metadata")
        .and_then(|m| m.get("ownerReferences"))
        .and_then(|o| o.as_array())
        .map(|refs| {
            refs.iter()
                .filter_map(|entry| {
                    Some(OwnerRef {
                        api_version: entry
                            .get("apiVersion")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        kind: entry.get("kind")?.as_str()?.to_string(),
                        name: entry.get("name")?.as_str()?.to_string(),
                        uid: entry.get("uid")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extract a value at a dotted path.
///
/// Supports the subset of JSONPath the relationship criteria use:
/// - `.field` / `.field.subfield` - object field access
/// - `field[2]` - array index access
/// - a leading `$` (and leading `.`) is optional
pub fn extract_path_value(obj: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(obj.clone());
    }

    let mut current = obj.clone();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        // Handle array access in path (e.g., "containers[0]")
        if let Some(bracket_pos) = part.find('[') {
            let field_name = &part[..bracket_pos];
            let close_bracket = part.find(']')?;
            let index: usize = part[bracket_pos + 1..close_bracket].parse().ok()?;

            if !field_name.is_empty() {
                current = current.get(field_name)?.clone();
            }
            current = current.as_array()?.get(index)?.clone();
        } else {
            current = current.get(part)?.clone();
        }
    }
    Some(current)
}

/// Compare an extracted value against an expected string.
///
/// Array-valued targets match if the expected string appears anywhere in
/// the array.
pub fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Array(items) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|s| s == expected)),
        _ => false,
    }
}
