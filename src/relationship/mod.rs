//! Kind-level relationship schema and graph
//!
//! A declarative document lists, per kind, the child relationships to other
//! kinds; the parent direction is derived automatically. The builder keeps
//! the kind graph cycle-free and materializes both directions of every edge
//! so traversal never has to infer the inverse.

mod builder;
mod count;

pub use builder::{DEFAULT_SCHEMA, KindGraph, NodeDeclaration, build, load_schema};
pub use count::{GroupRule, count_by_rules, count_relationship_graph};

use crate::models::GroupVersionKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Edge direction relative to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    Parent,
    Child,
}

impl EdgeDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeDirection::Parent => "parent",
            EdgeDirection::Child => "child",
        }
    }

    /// The opposite direction
    pub fn inverse(self) -> Self {
        match self {
            EdgeDirection::Parent => EdgeDirection::Child,
            EdgeDirection::Child => EdgeDirection::Parent,
        }
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How instances of two kinds are matched to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// Match through `metadata.ownerReferences` UIDs
    OwnerReference,
    /// Match instances whose labels satisfy the source's label selector
    Selector,
    /// Match through JSONPath criteria evaluated against each candidate
    JSONPath,
}

impl RelationshipType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::OwnerReference => "OwnerReference",
            RelationshipType::Selector => "Selector",
            RelationshipType::JSONPath => "JSONPath",
        }
    }
}

/// A directed edge descriptor between two kinds.
///
/// The GVK fields name the edge's target as seen from the node whose
/// `parent`/`children` list holds the entry. Endpoint nodes are referenced
/// through their arena keys, never through embedded pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub relation_type: RelationshipType,
    /// Whether instances of the related kind live outside namespaces
    #[serde(default)]
    pub cluster_scoped: bool,
    /// JSONPath criteria maps, evaluated as an OR of ANDs
    #[serde(default, rename = "jsonPath", skip_serializing_if = "Vec::is_empty")]
    pub json_path: Vec<BTreeMap<String, String>>,
    /// Set on edges synthesized as the reverse of a declared edge
    #[serde(skip)]
    pub auto_generated: bool,
    /// Arena key of the parent-side kind
    #[serde(skip)]
    pub parent_key: String,
    /// Arena key of the child-side kind
    #[serde(skip)]
    pub child_key: String,
}

impl Relationship {
    /// The GVK of the edge target
    pub fn target_gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }

    /// Structural equality used for idempotent edge insertion: same target
    /// GVK, same match type, same JSONPath criteria.
    pub fn same_edge(&self, other: &Relationship) -> bool {
        self.group == other.group
            && self.version == other.version
            && self.kind == other.kind
            && self.relation_type == other.relation_type
            && self.json_path == other.json_path
    }
}

/// A kind node with its declared and derived relationships.
///
/// Constructed once from the declarative document; `resource_count` is the
/// only field mutated afterwards, during the counting pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipGraphNode {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub parent: Vec<Relationship>,
    pub children: Vec<Relationship>,
    /// Live instance count, set by the counting pass
    pub resource_count: u64,
}

impl RelationshipGraphNode {
    /// The GVK this node represents
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }

    /// Arena key of this node
    pub fn key(&self) -> String {
        self.gvk().label()
    }
}

/// Arena of kind nodes addressed by their `group.version.kind` key
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    nodes: Vec<RelationshipGraphNode>,
    index: HashMap<String, usize>,
}

impl RelationshipGraph {
    /// Look up a node by its arena key
    pub fn get(&self, key: &str) -> Option<&RelationshipGraphNode> {
        self.index.get(key).map(|&idx| &self.nodes[idx])
    }

    /// Look up the node for a GVK
    pub fn get_by_gvk(&self, gvk: &GroupVersionKind) -> Option<&RelationshipGraphNode> {
        self.get(&gvk.label())
    }

    /// Index of an existing node, inserting an empty one if absent
    pub fn get_or_insert(&mut self, gvk: &GroupVersionKind) -> usize {
        let key = gvk.label();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(RelationshipGraphNode {
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            ..RelationshipGraphNode::default()
        });
        self.index.insert(key, idx);
        idx
    }

    /// Node at an arena index
    pub fn node_mut(&mut self, idx: usize) -> &mut RelationshipGraphNode {
        &mut self.nodes[idx]
    }

    /// All nodes, in declaration order
    pub fn nodes(&self) -> &[RelationshipGraphNode] {
        &self.nodes
    }

    /// All nodes, mutable; used by the counting pass
    pub fn nodes_mut(&mut self) -> &mut [RelationshipGraphNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
