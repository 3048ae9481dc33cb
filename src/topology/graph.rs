//! Instance-level graph and its transport conversion

use super::ResourceGraphNode;
use crate::graph::{AcyclicGraph, GraphError};
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// One entry of the resource topology transport map: the instance identity
/// plus the hashes of its direct parents and children
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTopologyEntry {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub parents: Vec<String>,
    pub children: Vec<String>,
}

/// Graph of concrete resource instances discovered during one resolution
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    inner: AcyclicGraph<ResourceGraphNode, ()>,
}

impl ResourceGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instance vertex; re-inserting is a no-op
    pub fn add_resource(&mut self, node: ResourceGraphNode) {
        self.inner.add_node(node);
    }

    /// Add a parent -> child edge between two instances.
    ///
    /// Malformed live data that would close a cycle is rejected without
    /// touching the rest of the graph.
    pub fn add_edge(
        &mut self,
        parent: ResourceGraphNode,
        child: ResourceGraphNode,
    ) -> Result<(), GraphError> {
        self.inner.add_edge(parent, child, ())
    }

    /// Whether the instance is already a vertex
    pub fn contains(&self, node: &ResourceGraphNode) -> bool {
        self.inner.contains(node)
    }

    /// Number of instances in the graph
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Whether the graph holds no instances
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Convert to the transport map keyed by vertex hash.
    ///
    /// Children come from the forward adjacency, parents from the
    /// predecessors. Vertices with no edges still appear, with empty lists.
    pub fn to_topology_map(&self) -> HashMap<String, ResourceTopologyEntry> {
        let mut map = HashMap::new();
        for node in self.inner.nodes() {
            let mut children: Vec<String> = self
                .inner
                .neighbors(node, Direction::Outgoing)
                .into_iter()
                .map(|child| child.hash())
                .collect();
            let mut parents: Vec<String> = self
                .inner
                .neighbors(node, Direction::Incoming)
                .into_iter()
                .map(|parent| parent.hash())
                .collect();
            children.sort();
            parents.sort();

            map.insert(
                node.hash(),
                ResourceTopologyEntry {
                    group: node.group.clone(),
                    version: node.version.clone(),
                    kind: node.kind.clone(),
                    namespace: node.namespace.clone(),
                    name: node.name.clone(),
                    parents,
                    children,
                },
            );
        }
        map
    }
}
