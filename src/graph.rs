//! Directed acyclic graph primitive
//!
//! Shared by the kind-level relationship graph and the resource-level
//! instance graph. Nodes are addressed through a key -> index arena instead
//! of embedded references, and edge insertion rejects anything that would
//! make the graph cyclic, leaving it in its prior valid state.

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::hash::Hash;

/// Errors from edge insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An identical edge is already present between the two nodes
    #[error("edge already exists")]
    DuplicateEdge,
    /// Inserting the edge would make the graph cyclic
    #[error("edge would introduce a cycle")]
    WouldCycle,
}

/// A directed graph that stays acyclic at edge-insertion time
#[derive(Debug, Clone)]
pub struct AcyclicGraph<N, E>
where
    N: Eq + Hash + Clone,
{
    graph: DiGraph<N, E>,
    index: HashMap<N, NodeIndex>,
}

impl<N, E> AcyclicGraph<N, E>
where
    N: Eq + Hash + Clone,
{
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a node if it is not already present, returning its index
    pub fn add_node(&mut self, node: N) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.index.insert(node, idx);
        idx
    }

    /// Whether the node is present in the graph
    pub fn contains(&self, node: &N) -> bool {
        self.index.contains_key(node)
    }

    /// Add a directed edge between two nodes, inserting missing endpoints.
    ///
    /// Duplicate edges and edges that would close a cycle are rejected;
    /// existing nodes and edges are untouched in either case.
    pub fn add_edge(&mut self, from: N, to: N, weight: E) -> Result<(), GraphError> {
        let a = self.add_node(from);
        let b = self.add_node(to);
        if self.graph.find_edge(a, b).is_some() {
            return Err(GraphError::DuplicateEdge);
        }
        // a path from the target back to the source means the new edge
        // closes a cycle
        if a == b || has_path_connecting(&self.graph, b, a, None) {
            return Err(GraphError::WouldCycle);
        }
        self.graph.add_edge(a, b, weight);
        Ok(())
    }

    /// Number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterate over all node payloads
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Direct neighbors of a node in the given direction.
    ///
    /// `Direction::Outgoing` yields the forward adjacency, and
    /// `Direction::Incoming` the predecessors.
    pub fn neighbors(&self, node: &N, direction: Direction) -> Vec<&N> {
        let Some(&idx) = self.index.get(node) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Whether a direct edge from `from` to `to` exists
    pub fn has_edge(&self, from: &N, to: &N) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }
}

impl<N, E> Default for AcyclicGraph<N, E>
where
    N: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph: AcyclicGraph<&str, ()> = AcyclicGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("a");
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_duplicate_edge_rejected() {
        let mut graph: AcyclicGraph<&str, ()> = AcyclicGraph::new();
        graph.add_edge("a", "b", ()).unwrap();
        assert_eq!(graph.add_edge("a", "b", ()), Err(GraphError::DuplicateEdge));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_cycle_rejected_and_graph_unchanged() {
        let mut graph: AcyclicGraph<&str, ()> = AcyclicGraph::new();
        graph.add_edge("a", "b", ()).unwrap();
        graph.add_edge("b", "c", ()).unwrap();

        assert_eq!(graph.add_edge("c", "a", ()), Err(GraphError::WouldCycle));

        // prior edges are intact
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge(&"a", &"b"));
        assert!(graph.has_edge(&"b", &"c"));
        assert!(!graph.has_edge(&"c", &"a"));
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut graph: AcyclicGraph<&str, ()> = AcyclicGraph::new();
        assert_eq!(graph.add_edge("a", "a", ()), Err(GraphError::WouldCycle));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_neighbors_both_directions() {
        let mut graph: AcyclicGraph<&str, ()> = AcyclicGraph::new();
        graph.add_edge("parent", "child", ()).unwrap();
        graph.add_edge("parent", "other", ()).unwrap();

        let mut children = graph.neighbors(&"parent", Direction::Outgoing);
        children.sort();
        assert_eq!(children, vec![&"child", &"other"]);
        assert_eq!(graph.neighbors(&"child", Direction::Incoming), vec![&"parent"]);
        assert!(graph.neighbors(&"missing", Direction::Outgoing).is_empty());
    }
}
