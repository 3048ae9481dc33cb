//! Resource-count annotation
//!
//! Walks the kind-level graph and annotates each node with the number of
//! live instances, either cluster-wide or scoped to one namespace.

use super::RelationshipGraph;
use crate::kube::{DiscoveryProvider, ResourceClient, SearchBackend};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Annotate every kind node with its live instance count.
///
/// With a namespace filter, kinds the discovery service reports as
/// cluster-scoped are silently skipped: they contribute no count for that
/// scope. A not-found listing is a count of zero; any other client error
/// aborts the whole pass.
pub async fn count_relationship_graph(
    client: &dyn ResourceClient,
    discovery: &dyn DiscoveryProvider,
    graph: &mut RelationshipGraph,
    namespace: Option<&str>,
) -> Result<()> {
    for node in graph.nodes_mut() {
        let gvk = node.gvk();

        if namespace.is_some() {
            let namespaced = match discovery.is_namespaced(&gvk).await {
                Ok(namespaced) => namespaced,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(kind = %gvk, "kind not served by the cluster, count is zero");
                    node.resource_count = 0;
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("discovery for {gvk} failed"));
                }
            };
            if !namespaced {
                tracing::debug!(kind = %gvk, "cluster-scoped kind skipped for namespace filter");
                continue;
            }
        }

        node.resource_count = match client.list(&gvk, namespace).await {
            Ok(instances) => instances.len() as u64,
            Err(e) if e.is_not_found() => 0,
            Err(e) => {
                return Err(e).with_context(|| format!("listing {gvk} instances failed"));
            }
        };
    }
    Ok(())
}

/// A user-defined resource grouping counted through the search backend
/// instead of live listing
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRule {
    pub name: String,
    #[serde(default)]
    pub terms: BTreeMap<String, String>,
}

/// Count each rule's matching resources through the search backend.
///
/// Follows the same error policy as the live counting pass: not-found is
/// zero, everything else aborts.
pub async fn count_by_rules(
    search: &dyn SearchBackend,
    rules: &[GroupRule],
) -> Result<BTreeMap<String, u64>> {
    let mut counts = BTreeMap::new();
    for rule in rules {
        let count = match search.search_by_terms(&rule.terms).await {
            Ok(count) => count as u64,
            Err(e) if e.is_not_found() => 0,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("searching resource group {} failed", rule.name));
            }
        };
        counts.insert(rule.name.clone(), count);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{ClientError, MockDiscoveryProvider, MockResourceClient, MockSearchBackend};
    use crate::relationship::{build, load_schema};
    use serde_json::json;

    const SCHEMA: &str = r#"
- group: apps
  version: v1
  kind: ReplicaSet
  children:
    - group: ""
      version: v1
      kind: Pod
      type: OwnerReference
"#;

    #[tokio::test]
    async fn test_count_cluster_wide() {
        let (_, mut graph) = build(&load_schema(SCHEMA).unwrap()).unwrap();

        let mut client = MockResourceClient::new();
        client.expect_list().returning(|gvk, namespace| {
            assert!(namespace.is_none());
            match gvk.kind.as_str() {
                "ReplicaSet" => Ok(vec![json!({}), json!({})]),
                _ => Ok(vec![json!({})]),
            }
        });
        let discovery = MockDiscoveryProvider::new();

        count_relationship_graph(&client, &discovery, &mut graph, None)
            .await
            .unwrap();

        assert_eq!(graph.get("apps.v1.ReplicaSet").unwrap().resource_count, 2);
        assert_eq!(graph.get("v1.Pod").unwrap().resource_count, 1);
    }

    #[tokio::test]
    async fn test_count_skips_cluster_scoped_kinds_under_namespace_filter() {
        let (_, mut graph) = build(&load_schema(SCHEMA).unwrap()).unwrap();

        let mut discovery = MockDiscoveryProvider::new();
        discovery
            .expect_is_namespaced()
            .returning(|gvk| Ok(gvk.kind == "Pod"));

        let mut client = MockResourceClient::new();
        client.expect_list().returning(|gvk, namespace| {
            assert_eq!(gvk.kind, "Pod");
            assert_eq!(namespace, Some("default"));
            Ok(vec![json!({}), json!({}), json!({})])
        });

        count_relationship_graph(&client, &discovery, &mut graph, Some("default"))
            .await
            .unwrap();

        assert_eq!(graph.get("v1.Pod").unwrap().resource_count, 3);
        assert_eq!(graph.get("apps.v1.ReplicaSet").unwrap().resource_count, 0);
    }

    #[tokio::test]
    async fn test_not_found_listing_is_zero() {
        let (_, mut graph) = build(&load_schema(SCHEMA).unwrap()).unwrap();

        let mut client = MockResourceClient::new();
        client
            .expect_list()
            .returning(|gvk, _| Err(ClientError::NotFound(gvk.label())));
        let discovery = MockDiscoveryProvider::new();

        count_relationship_graph(&client, &discovery, &mut graph, None)
            .await
            .unwrap();
        assert_eq!(graph.get("v1.Pod").unwrap().resource_count, 0);
    }

    #[tokio::test]
    async fn test_other_listing_error_aborts() {
        let (_, mut graph) = build(&load_schema(SCHEMA).unwrap()).unwrap();

        let mut client = MockResourceClient::new();
        client
            .expect_list()
            .returning(|_, _| Err(ClientError::Other(anyhow::anyhow!("permission denied"))));
        let discovery = MockDiscoveryProvider::new();

        let err = count_relationship_graph(&client, &discovery, &mut graph, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("listing"));
    }

    #[tokio::test]
    async fn test_count_by_rules() {
        let mut search = MockSearchBackend::new();
        search.expect_search_by_terms().returning(|terms| {
            if terms.get("team").map(String::as_str) == Some("payments") {
                Ok(7)
            } else {
                Err(ClientError::NotFound("no index".to_string()))
            }
        });

        let rules = vec![
            GroupRule {
                name: "payments".to_string(),
                terms: BTreeMap::from([("team".to_string(), "payments".to_string())]),
            },
            GroupRule {
                name: "unknown".to_string(),
                terms: BTreeMap::new(),
            },
        ];

        let counts = count_by_rules(&search, &rules).await.unwrap();
        assert_eq!(counts.get("payments"), Some(&7));
        assert_eq!(counts.get("unknown"), Some(&0));
    }
}
