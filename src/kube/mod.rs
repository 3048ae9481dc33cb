//! Cluster collaborators
//!
//! The engine consumes the cluster through narrow async traits so the
//! resolver, counting pass and scanner can run against a live cluster or an
//! in-memory fake. A "not found" answer is distinguishable from every other
//! failure: callers recover it locally as "zero matches".

mod client;

pub use client::{KubeDiscovery, KubeResourceClient};

use crate::models::GroupVersionKind;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Errors surfaced by cluster collaborators
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The requested resource or kind does not exist
    #[error("{0} not found")]
    NotFound(String),
    /// Any other failure (timeout, permission denial, transport)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Whether this error is a not-found classification
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Live access to cluster resources as schema-less JSON documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// List instances of a kind, cluster-wide when `namespace` is `None`
    async fn list<'a>(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&'a str>,
    ) -> Result<Vec<Value>, ClientError>;

    /// Get a single instance by name
    async fn get<'a>(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&'a str>,
        name: &str,
    ) -> Result<Value, ClientError>;
}

/// Kind scope discovery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Whether instances of the kind live inside namespaces
    async fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, ClientError>;
}

/// Search backend used by custom resource-group counting
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Count the resources matching a term map
    async fn search_by_terms(
        &self,
        terms: &BTreeMap<String, String>,
    ) -> Result<usize, ClientError>;
}
