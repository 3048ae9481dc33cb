//! Topology facades

use super::DEFAULT_RESULT_TTL;
use crate::cache::Cache;
use crate::kube::{DiscoveryProvider, ResourceClient, SearchBackend};
use crate::models::ResourceGroup;
use crate::relationship::{
    self, EdgeDirection, GroupRule, NodeDeclaration, RelationshipGraph,
};
use crate::topology::{ResourceGraphResolver, ResourceTopologyEntry};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// One kind entry of the cluster topology map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTopologyEntry {
    /// `group.version.kind` label of the kind
    pub group_version_kind: String,
    /// Live instance count for the queried scope
    pub count: u64,
    /// Related kind key -> edge direction as seen from this kind
    pub relationship: BTreeMap<String, String>,
}

/// Cache-fronted topology queries over one cluster
pub struct TopologyService {
    client: Arc<dyn ResourceClient>,
    discovery: Arc<dyn DiscoveryProvider>,
    schema: Vec<NodeDeclaration>,
    cluster_cache: Cache<String, HashMap<String, ClusterTopologyEntry>>,
    resource_cache: Cache<String, HashMap<String, ResourceTopologyEntry>>,
    ttl: Duration,
}

impl TopologyService {
    /// Build a service over a declarative relationship document.
    ///
    /// An unparsable document aborts construction.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        discovery: Arc<dyn DiscoveryProvider>,
        schema_doc: &str,
    ) -> Result<Self> {
        let schema = relationship::load_schema(schema_doc)?;
        Ok(Self {
            client,
            discovery,
            schema,
            cluster_cache: Cache::new(),
            resource_cache: Cache::new(),
            ttl: DEFAULT_RESULT_TTL,
        })
    }

    /// Override the result TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Kind-level topology of a whole cluster, or of one namespace, with
    /// live instance counts
    pub async fn get_topology_for_cluster(
        &self,
        cluster: &str,
        namespace: Option<&str>,
        no_cache: bool,
    ) -> Result<HashMap<String, ClusterTopologyEntry>> {
        let scope = ResourceGroup {
            cluster: cluster.to_string(),
            namespace: namespace.unwrap_or_default().to_string(),
            ..ResourceGroup::default()
        };
        let key = scope.hash();
        if !no_cache {
            if let Some(hit) = self.cluster_cache.get(&key).await {
                tracing::debug!(cluster, "cluster topology served from cache");
                return Ok(hit);
            }
        }

        let (_graph, mut relationships) = relationship::build(&self.schema)?;
        relationship::count_relationship_graph(
            self.client.as_ref(),
            self.discovery.as_ref(),
            &mut relationships,
            namespace,
        )
        .await
        .context("resource counting pass failed")?;

        let map = cluster_topology_map(cluster, &relationships);
        self.cluster_cache.set(key, map.clone(), self.ttl).await;
        Ok(map)
    }

    /// Instance-level topology around one concrete resource
    pub async fn get_topology_for_resource(
        &self,
        scope: &ResourceGroup,
        no_cache: bool,
    ) -> Result<HashMap<String, ResourceTopologyEntry>> {
        let key = scope.hash();
        if !no_cache {
            if let Some(hit) = self.resource_cache.get(&key).await {
                tracing::debug!(scope = %scope, "resource topology served from cache");
                return Ok(hit);
            }
        }

        let gvk = scope.gvk();
        let namespace = (!scope.namespace.is_empty()).then_some(scope.namespace.as_str());
        let obj = self
            .client
            .get(&gvk, namespace, &scope.name)
            .await
            .with_context(|| format!("fetching {scope} failed"))?;

        let (_graph, relationships) = relationship::build(&self.schema)?;
        let resolver = ResourceGraphResolver::new(self.client.as_ref(), &relationships);
        let map = resolver.resolve(&obj).await?.to_topology_map();

        self.resource_cache.set(key, map.clone(), self.ttl).await;
        Ok(map)
    }

    /// Count user-defined resource groupings through the search backend
    /// instead of live listing
    pub async fn count_resource_groups(
        &self,
        search: &dyn SearchBackend,
        rules: &[GroupRule],
    ) -> Result<BTreeMap<String, u64>> {
        relationship::count_by_rules(search, rules).await
    }
}

/// Convert the counted relationship graph into the transport map keyed by
/// the per-kind scope hash
fn cluster_topology_map(
    cluster: &str,
    relationships: &RelationshipGraph,
) -> HashMap<String, ClusterTopologyEntry> {
    let mut map = HashMap::new();
    for node in relationships.nodes() {
        let gvk = node.gvk();
        let scope = ResourceGroup {
            cluster: cluster.to_string(),
            api_version: gvk.api_version(),
            kind: gvk.kind.clone(),
            ..ResourceGroup::default()
        };

        let mut relationship_labels = BTreeMap::new();
        for rel in &node.parent {
            relationship_labels.insert(
                rel.target_gvk().label(),
                EdgeDirection::Parent.as_str().to_string(),
            );
        }
        for rel in &node.children {
            relationship_labels.insert(
                rel.target_gvk().label(),
                EdgeDirection::Child.as_str().to_string(),
            );
        }

        map.insert(
            scope.hash(),
            ClusterTopologyEntry {
                group_version_kind: gvk.label(),
                count: node.resource_count,
                relationship: relationship_labels,
            },
        );
    }
    map
}
