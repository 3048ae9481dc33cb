//! Relationship schema loading and graph construction

use super::{Relationship, RelationshipGraph, RelationshipType};
use crate::graph::{AcyclicGraph, GraphError};
use crate::models::GroupVersionKind;
use anyhow::{Context, Result};
use serde::Deserialize;

/// The kind-level graph: one vertex per kind key, one edge per declared
/// parent -> child relationship, annotated with the match type
pub type KindGraph = AcyclicGraph<String, RelationshipType>;

/// One node of the declarative relationship document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDeclaration {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default)]
    pub children: Vec<Relationship>,
}

impl NodeDeclaration {
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }
}

/// Built-in relationship schema for the core workload kinds
pub const DEFAULT_SCHEMA: &str = include_str!("default_schema.yaml");

/// Parse a relationship document.
///
/// An unparsable document is fatal: the engine must not start with a
/// half-read schema.
pub fn load_schema(doc: &str) -> Result<Vec<NodeDeclaration>> {
    serde_yaml::from_str(doc).context("failed to parse relationship schema document")
}

/// Build the kind graph and relationship arena from a declarative schema.
///
/// For every declared child edge the inverse parent entry is synthesized
/// exactly once; re-declaring an equal edge is a no-op. Contradictory
/// declarations that would close a cycle are logged and skipped, leaving
/// the rest of the schema intact.
pub fn build(declarations: &[NodeDeclaration]) -> Result<(KindGraph, RelationshipGraph)> {
    let mut graph = KindGraph::new();
    let mut relationships = RelationshipGraph::default();

    for declaration in declarations {
        let parent_gvk = declaration.gvk();
        let parent_key = parent_gvk.label();
        let parent_idx = relationships.get_or_insert(&parent_gvk);
        graph.add_node(parent_key.clone());

        for child in &declaration.children {
            let child_gvk = child.target_gvk();
            let child_key = child_gvk.label();

            // The kind graph decides whether this edge may exist at all.
            match graph.add_edge(parent_key.clone(), child_key.clone(), child.relation_type) {
                Ok(()) | Err(GraphError::DuplicateEdge) => {}
                Err(GraphError::WouldCycle) => {
                    tracing::warn!(
                        parent = %parent_key,
                        child = %child_key,
                        "relationship declaration would introduce a cycle, skipped"
                    );
                    continue;
                }
            }

            let mut declared = child.clone();
            declared.parent_key = parent_key.clone();
            declared.child_key = child_key.clone();

            // The inverse entry sits on the child node and points back at
            // the parent kind, carrying the same match criteria.
            let mut inverse = declared.clone();
            inverse.group = parent_gvk.group.clone();
            inverse.version = parent_gvk.version.clone();
            inverse.kind = parent_gvk.kind.clone();
            inverse.auto_generated = true;

            let child_idx = relationships.get_or_insert(&child_gvk);
            let child_node = relationships.node_mut(child_idx);
            if !child_node.parent.iter().any(|r| r.same_edge(&inverse)) {
                child_node.parent.push(inverse);
            }

            let parent_node = relationships.node_mut(parent_idx);
            if !parent_node.children.iter().any(|r| r.same_edge(&declared)) {
                parent_node.children.push(declared);
            }
        }
    }

    Ok((graph, relationships))
}
