//! Recursive resolution of a resource's live relatives
//!
//! Starting from one concrete instance, discovers its actual parents and
//! children by consulting the kind-level relationship graph and listing
//! live candidates through the cluster client. Traversal continues in the
//! direction it arrived from, so an edge is never re-walked backwards.

use super::{ResourceGraph, ResourceGraphNode};
use crate::graph::GraphError;
use crate::kube::ResourceClient;
use crate::models::fields;
use crate::relationship::{EdgeDirection, Relationship, RelationshipGraph, RelationshipType};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Resolves the instance-level graph around one live resource
pub struct ResourceGraphResolver<'a> {
    client: &'a dyn ResourceClient,
    relationships: &'a RelationshipGraph,
}

impl<'a> ResourceGraphResolver<'a> {
    pub fn new(client: &'a dyn ResourceClient, relationships: &'a RelationshipGraph) -> Self {
        Self {
            client,
            relationships,
        }
    }

    /// Resolve the instance graph around one live object.
    ///
    /// A kind absent from the relationship schema simply has no topology:
    /// the result is an empty graph, not an error.
    pub async fn resolve(&self, root: &Value) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let Some(root_node) = ResourceGraphNode::from_object(root) else {
            bail!("object is missing its identity fields");
        };
        if self.relationships.get(&root_node.kind_key()).is_none() {
            tracing::debug!(resource = %root_node, "kind not in relationship schema, topology is empty");
            return Ok(graph);
        }
        graph.add_resource(root_node.clone());

        // Iterative worklist instead of async recursion; each queue entry
        // keeps walking in the direction it was discovered from.
        let mut visited: HashSet<(String, EdgeDirection)> = HashSet::new();
        let mut queue: VecDeque<(Value, ResourceGraphNode, EdgeDirection)> = VecDeque::new();
        for direction in [EdgeDirection::Parent, EdgeDirection::Child] {
            visited.insert((root_node.hash(), direction));
            queue.push_back((root.clone(), root_node.clone(), direction));
        }

        while let Some((obj, node, direction)) = queue.pop_front() {
            let Some(kind_node) = self.relationships.get(&node.kind_key()) else {
                continue;
            };
            let edges = match direction {
                EdgeDirection::Parent => &kind_node.parent,
                EdgeDirection::Child => &kind_node.children,
            };

            for relationship in edges {
                let matches = self
                    .find_matches(&obj, &node, relationship, direction)
                    .await?;
                for candidate in matches {
                    let Some(candidate_node) = ResourceGraphNode::from_object(&candidate) else {
                        continue;
                    };
                    graph.add_resource(candidate_node.clone());

                    let (parent, child) = match direction {
                        EdgeDirection::Parent => (candidate_node.clone(), node.clone()),
                        EdgeDirection::Child => (node.clone(), candidate_node.clone()),
                    };
                    match graph.add_edge(parent, child) {
                        Ok(()) => {}
                        Err(GraphError::DuplicateEdge) => {}
                        Err(GraphError::WouldCycle) => {
                            tracing::warn!(
                                from = %node,
                                to = %candidate_node,
                                "relationship edge would introduce a cycle, skipped"
                            );
                            continue;
                        }
                    }

                    if visited.insert((candidate_node.hash(), direction)) {
                        queue.push_back((candidate, candidate_node, direction));
                    }
                }
            }
        }

        Ok(graph)
    }

    /// List candidates of the related kind and keep the ones matching the
    /// edge's strategy.
    async fn find_matches(
        &self,
        obj: &Value,
        node: &ResourceGraphNode,
        relationship: &Relationship,
        direction: EdgeDirection,
    ) -> Result<Vec<Value>> {
        let target = relationship.target_gvk();
        let namespace = if relationship.cluster_scoped {
            None
        } else {
            (!node.namespace.is_empty()).then_some(node.namespace.as_str())
        };

        let candidates = match self.client.list(&target, namespace).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_not_found() => {
                tracing::warn!(kind = %target, "no instances of related kind found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("listing {target} instances failed"));
            }
        };

        let matched = match relationship.relation_type {
            RelationshipType::OwnerReference => match direction {
                EdgeDirection::Child => owner_children(obj, candidates),
                EdgeDirection::Parent => owner_parent(obj, node, candidates),
            },
            RelationshipType::Selector => {
                selector_matches(obj, relationship, direction, candidates)
            }
            RelationshipType::JSONPath => json_path_matches(obj, relationship, candidates),
        };
        Ok(matched)
    }
}

/// Candidates whose `ownerReferences` name the current object's UID
fn owner_children(obj: &Value, candidates: Vec<Value>) -> Vec<Value> {
    let Some(uid) = fields::object_uid(obj) else {
        return Vec::new();
    };
    candidates
        .into_iter()
        .filter(|candidate| {
            fields::owner_references(candidate)
                .iter()
                .any(|owner| owner.uid == uid)
        })
        .collect()
}

/// The candidate whose UID the current object's single owner reference
/// names. More than one owner reference is treated as "no parent found".
fn owner_parent(
    obj: &Value,
    node: &ResourceGraphNode,
    candidates: Vec<Value>,
) -> Vec<Value> {
    let owners = fields::owner_references(obj);
    if owners.len() > 1 {
        tracing::warn!(
            resource = %node,
            owners = owners.len(),
            "multiple owner references, treating as no parent"
        );
        return Vec::new();
    }
    let Some(owner) = owners.into_iter().next() else {
        return Vec::new();
    };
    candidates
        .into_iter()
        .filter(|candidate| fields::object_uid(candidate) == Some(owner.uid.as_str()))
        .collect()
}

/// Selector matching, direction-aware: walking down, the current object
/// carries the selector and candidates must carry matching labels; walking
/// up, each candidate carries the selector and it must cover the current
/// object's labels.
fn selector_matches(
    obj: &Value,
    relationship: &Relationship,
    direction: EdgeDirection,
    candidates: Vec<Value>,
) -> Vec<Value> {
    match direction {
        EdgeDirection::Child => {
            let Some(selector) = extract_selector(obj, relationship) else {
                tracing::debug!("object carries no label selector, no matches");
                return Vec::new();
            };
            if selector.is_empty() {
                return Vec::new();
            }
            candidates
                .into_iter()
                .filter(|candidate| covers(&selector, &fields::object_labels(candidate)))
                .collect()
        }
        EdgeDirection::Parent => {
            let labels = fields::object_labels(obj);
            candidates
                .into_iter()
                .filter(|candidate| {
                    extract_selector(candidate, relationship)
                        .is_some_and(|selector| !selector.is_empty() && covers(&selector, &labels))
                })
                .collect()
        }
    }
}

/// Whether every selector entry is present in the label set
fn covers(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

/// The label selector the source object carries at the edge's declared
/// path. A `matchLabels` wrapper (apps/v1 style) is unwrapped.
fn extract_selector(obj: &Value, relationship: &Relationship) -> Option<BTreeMap<String, String>> {
    let path = relationship
        .json_path
        .iter()
        .find_map(|criteria| criteria.get("selector"))
        .map(String::as_str)
        .unwrap_or(".spec.selector");

    let value = fields::extract_path_value(obj, path)?;
    let value = value.get("matchLabels").cloned().unwrap_or(value);
    value.as_object().map(|selector| {
        selector
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

/// Candidates where some criteria map matches completely: every key names
/// a source field (`name` or `namespace`) and the value extracted from the
/// candidate at the key's JSONPath equals it (or contains it, for arrays).
fn json_path_matches(
    obj: &Value,
    relationship: &Relationship,
    candidates: Vec<Value>,
) -> Vec<Value> {
    let name = fields::object_name(obj).unwrap_or_default().to_string();
    let namespace = fields::object_namespace(obj).unwrap_or_default().to_string();

    candidates
        .into_iter()
        .filter(|candidate| {
            relationship.json_path.iter().any(|criteria| {
                !criteria.is_empty()
                    && criteria.iter().all(|(key, expression)| {
                        let expected = match key.as_str() {
                            "name" => name.as_str(),
                            "namespace" => namespace.as_str(),
                            _ => return false,
                        };
                        fields::extract_path_value(candidate, expression)
                            .map(|value| fields::value_matches(&value, expected))
                            .unwrap_or(false)
                    })
            })
        })
        .collect()
}
