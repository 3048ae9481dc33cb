//! Audit facade

use super::DEFAULT_RESULT_TTL;
use crate::cache::Cache;
use crate::kube::ResourceClient;
use crate::models::ResourceGroup;
use crate::scanner::{ScanAggregator, ScanResult, ScoreSummary, SecurityAuditor, summarize};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Cache-fronted security audits over one cluster
pub struct AuditService {
    client: Arc<dyn ResourceClient>,
    aggregator: ScanAggregator,
    cache: Cache<String, ScanResult>,
    ttl: Duration,
}

impl AuditService {
    pub fn new(client: Arc<dyn ResourceClient>, auditor: Arc<dyn SecurityAuditor>) -> Self {
        Self {
            client,
            aggregator: ScanAggregator::new(auditor),
            cache: Cache::new(),
            ttl: DEFAULT_RESULT_TTL,
        }
    }

    /// Override the result TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Audit every resource in scope.
    ///
    /// A scope with a name audits that single resource; otherwise all
    /// instances of the scope's kind are scanned. Results are cached by
    /// scope hash.
    pub async fn audit(&self, scope: &ResourceGroup, no_cache: bool) -> Result<ScanResult> {
        let key = scope.hash();
        if !no_cache {
            if let Some(hit) = self.cache.get(&key).await {
                tracing::debug!(scope = %scope, "audit served from cache");
                return Ok(hit);
            }
        }

        let objects = self.collect(scope).await?;
        let result = self.aggregator.scan(&scope.cluster, objects, no_cache).await?;

        self.cache.set(key, result.clone(), self.ttl).await;
        Ok(result)
    }

    /// Aggregate health score for the resources in scope
    pub async fn score(&self, scope: &ResourceGroup, no_cache: bool) -> Result<ScoreSummary> {
        let result = self.audit(scope, no_cache).await?;
        Ok(summarize(&result))
    }

    /// Gather the live objects the scope addresses. A not-found answer is
    /// an empty batch, not an error.
    async fn collect(&self, scope: &ResourceGroup) -> Result<Vec<Value>> {
        let gvk = scope.gvk();
        let namespace = (!scope.namespace.is_empty()).then_some(scope.namespace.as_str());

        if !scope.name.is_empty() {
            match self.client.get(&gvk, namespace, &scope.name).await {
                Ok(obj) => Ok(vec![obj]),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(scope = %scope, "resource not found, nothing to audit");
                    Ok(Vec::new())
                }
                Err(e) => Err(e).with_context(|| format!("fetching {scope} failed")),
            }
        } else {
            match self.client.list(&gvk, namespace).await {
                Ok(objects) => Ok(objects),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(scope = %scope, "kind not found, nothing to audit");
                    Ok(Vec::new())
                }
                Err(e) => Err(e).with_context(|| format!("listing {scope} failed")),
            }
        }
    }
}
