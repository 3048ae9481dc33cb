//! Relationship schema and kind-graph tests
//!
//! Tests for schema loading, bidirectional edge materialization and
//! cycle safety of the kind-level graph.

use klens::relationship::{RelationshipType, build, load_schema};

const WORKLOAD_SCHEMA: &str = r#"
- group: apps
  version: v1
  kind: Deployment
  children:
    - group: apps
      version: v1
      kind: ReplicaSet
      type: OwnerReference
- group: apps
  version: v1
  kind: ReplicaSet
  children:
    - group: ""
      version: v1
      kind: Pod
      type: OwnerReference
- group: ""
  version: v1
  kind: Service
  children:
    - group: ""
      version: v1
      kind: Pod
      type: Selector
"#;

#[test]
fn test_schema_round_trip() {
    let declarations = load_schema(WORKLOAD_SCHEMA).unwrap();
    assert_eq!(declarations.len(), 3);
    assert_eq!(declarations[0].kind, "Deployment");
    assert_eq!(declarations[0].children.len(), 1);
    assert_eq!(
        declarations[2].children[0].relation_type,
        RelationshipType::Selector
    );
}

#[test]
fn test_every_child_edge_has_a_parent_counterpart() {
    let (_, relationships) = build(&load_schema(WORKLOAD_SCHEMA).unwrap()).unwrap();

    for node in relationships.nodes() {
        for child in &node.children {
            let target = relationships.get(&child.target_gvk().label()).unwrap();
            assert!(
                target.parent.iter().any(|parent| {
                    parent.target_gvk().label() == node.key()
                        && parent.relation_type == child.relation_type
                }),
                "child edge {} -> {} has no parent counterpart",
                node.key(),
                child.target_gvk().label(),
            );
        }
        for parent in &node.parent {
            let target = relationships.get(&parent.target_gvk().label()).unwrap();
            assert!(
                target.children.iter().any(|child| {
                    child.target_gvk().label() == node.key()
                        && child.relation_type == parent.relation_type
                }),
                "parent edge {} -> {} has no child counterpart",
                node.key(),
                parent.target_gvk().label(),
            );
        }
    }
}

#[test]
fn test_rebuilding_is_deterministic() {
    let declarations = load_schema(WORKLOAD_SCHEMA).unwrap();
    let (_, first) = build(&declarations).unwrap();
    let (_, second) = build(&declarations).unwrap();

    assert_eq!(first.len(), second.len());
    for node in first.nodes() {
        let other = second.get(&node.key()).unwrap();
        assert_eq!(node.parent.len(), other.parent.len());
        assert_eq!(node.children.len(), other.children.len());
    }
}

#[test]
fn test_pod_aggregates_parents_from_multiple_kinds() {
    let (_, relationships) = build(&load_schema(WORKLOAD_SCHEMA).unwrap()).unwrap();

    let pod = relationships.get("v1.Pod").unwrap();
    let mut parent_kinds: Vec<&str> =
        pod.parent.iter().map(|p| p.kind.as_str()).collect();
    parent_kinds.sort();
    assert_eq!(parent_kinds, vec!["ReplicaSet", "Service"]);
    assert!(pod.parent.iter().all(|p| p.auto_generated));
}

#[test]
fn test_kind_graph_carries_relation_types() {
    let (graph, _) = build(&load_schema(WORKLOAD_SCHEMA).unwrap()).unwrap();

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);
    assert!(graph.has_edge(
        &"apps.v1.Deployment".to_string(),
        &"apps.v1.ReplicaSet".to_string()
    ));
    assert!(graph.has_edge(&"v1.Service".to_string(), &"v1.Pod".to_string()));
}

#[test]
fn test_contradictory_declaration_keeps_graph_valid() {
    let doc = r#"
- group: apps
  version: v1
  kind: Deployment
  children:
    - group: apps
      version: v1
      kind: ReplicaSet
      type: OwnerReference
- group: apps
  version: v1
  kind: ReplicaSet
  children:
    - group: ""
      version: v1
      kind: Pod
      type: OwnerReference
- group: ""
  version: v1
  kind: Pod
  children:
    - group: apps
      version: v1
      kind: Deployment
      type: OwnerReference
"#;
    let (graph, relationships) = build(&load_schema(doc).unwrap()).unwrap();

    // the Pod -> Deployment declaration closes a cycle and is skipped
    assert_eq!(graph.edge_count(), 2);
    let pod = relationships.get("v1.Pod").unwrap();
    assert!(pod.children.is_empty());

    // the rest of the schema is unaffected
    let deployment = relationships.get("apps.v1.Deployment").unwrap();
    assert_eq!(deployment.children.len(), 1);
    assert!(deployment.parent.is_empty());
}

#[test]
fn test_garbage_document_fails_loudly() {
    assert!(load_schema("{{{").is_err());
    assert!(load_schema("- group: apps\n  children: 3\n").is_err());
}
