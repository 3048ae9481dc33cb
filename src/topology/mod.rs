//! Live resource topology
//!
//! Resolves the concrete parent and child instances of one live resource by
//! walking the kind-level relationship graph against the cluster, then
//! converts the instance graph into a serializable transport map.

mod graph;
mod resolver;

pub use graph::{ResourceGraph, ResourceTopologyEntry};
pub use resolver::ResourceGraphResolver;

use crate::models::{GroupVersionKind, fields};
use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a concrete resource instance.
///
/// Doubles as graph vertex and transport-map key (through its hash).
/// Instances only live for the duration of one resolution; they are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGraphNode {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceGraphNode {
    /// Build the vertex identity of a live object.
    ///
    /// Returns `None` when the object is missing its identity fields.
    pub fn from_object(obj: &Value) -> Option<Self> {
        let gvk = fields::object_gvk(obj)?;
        let name = fields::object_name(obj)?.to_string();
        let namespace = fields::object_namespace(obj).unwrap_or_default().to_string();
        Some(Self {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            namespace,
            name,
        })
    }

    /// The GVK of this instance
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }

    /// Arena key of this instance's kind in the relationship graph
    pub fn kind_key(&self) -> String {
        self.gvk().label()
    }

    /// Deterministic hash of all identity fields; the transport-map key
    pub fn hash(&self) -> String {
        let mut hasher = DefaultHasher::new();
        for part in [
            &self.group,
            &self.version,
            &self.kind,
            &self.namespace,
            &self.name,
        ] {
            part.hash(&mut hasher);
        }
        format!("{:016x}", hasher.finish())
    }
}

impl fmt::Display for ResourceGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind_key(), self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_object() {
        let obj = json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {"name": "web-rs", "namespace": "default"},
        });
        let node = ResourceGraphNode::from_object(&obj).unwrap();
        assert_eq!(node.kind_key(), "apps.v1.ReplicaSet");
        assert_eq!(node.to_string(), "apps.v1.ReplicaSet/default/web-rs");

        assert!(ResourceGraphNode::from_object(&json!({"kind": "Pod"})).is_none());
    }

    #[test]
    fn test_hash_is_stable_per_identity() {
        let a = ResourceGraphNode {
            group: "apps".to_string(),
            version: "v1".to_string(),
            kind: "Deployment".to_string(),
            namespace: "default".to_string(),
            name: "web".to_string(),
        };
        let b = a.clone();
        assert_eq!(a.hash(), b.hash());

        let other = ResourceGraphNode {
            name: "api".to_string(),
            ..a.clone()
        };
        assert_ne!(a.hash(), other.hash());
    }
}
