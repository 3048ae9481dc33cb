//! Concurrent scan fan-out and merge
//!
//! One worker task per resource, results merged into a shared accumulator
//! and errors funneled through a channel. Workers always run to
//! completion: the call fails only after every worker has finished.

use super::auditor::SecurityAuditor;
use super::{Issue, ScanResult};
use crate::cache::Cache;
use crate::models::ResourceGroup;
use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// Default TTL for per-resource scan results
const DEFAULT_SCAN_TTL: Duration = Duration::from_secs(10 * 60);

/// Runs a pluggable auditor concurrently over a batch of resources and
/// merges the per-resource findings
pub struct ScanAggregator {
    auditor: Arc<dyn SecurityAuditor>,
    resource_cache: Arc<Cache<String, Vec<Issue>>>,
    ttl: Duration,
}

impl ScanAggregator {
    pub fn new(auditor: Arc<dyn SecurityAuditor>) -> Self {
        Self::with_ttl(auditor, DEFAULT_SCAN_TTL)
    }

    pub fn with_ttl(auditor: Arc<dyn SecurityAuditor>, ttl: Duration) -> Self {
        Self {
            auditor,
            resource_cache: Arc::new(Cache::new()),
            ttl,
        }
    }

    /// Scan a batch of live objects, one worker per resource.
    ///
    /// With `no_cache` unset, resources scanned within the TTL window are
    /// served from the per-resource cache and no worker is spawned for
    /// them. A worker panic is converted into a reported error; if any
    /// worker fails the whole call fails, after all workers completed.
    pub async fn scan(
        &self,
        cluster: &str,
        objects: Vec<Value>,
        no_cache: bool,
    ) -> Result<ScanResult> {
        let result = Arc::new(Mutex::new(ScanResult::new()));
        let (err_tx, mut err_rx) = mpsc::unbounded_channel::<anyhow::Error>();
        let mut workers = Vec::new();

        for obj in objects {
            let Some(resource) = ResourceGroup::from_object(cluster, &obj) else {
                tracing::warn!("object without identity fields skipped by scan");
                continue;
            };

            if !no_cache {
                if let Some(issues) = self.resource_cache.get(&resource.hash()).await {
                    tracing::debug!(resource = %resource, "scan served from cache");
                    result.lock().await.add(&resource, &issues);
                    continue;
                }
            }

            let auditor = Arc::clone(&self.auditor);
            let cache = Arc::clone(&self.resource_cache);
            let ttl = self.ttl;
            let result = Arc::clone(&result);
            let err_tx = err_tx.clone();
            workers.push(tokio::spawn(async move {
                match audit_object(auditor.as_ref(), &obj) {
                    Ok(issues) => {
                        cache.set(resource.hash(), issues.clone(), ttl).await;
                        result.lock().await.add(&resource, &issues);
                    }
                    Err(e) => {
                        let _ = err_tx.send(e.context(format!("scanning {resource} failed")));
                    }
                }
            }));
        }

        for worker in workers {
            if let Err(join_err) = worker.await {
                let _ = err_tx.send(anyhow!("scan worker panicked: {join_err}"));
            }
        }
        drop(err_tx);

        if let Some(err) = err_rx.recv().await {
            return Err(err);
        }

        let result = std::mem::take(&mut *result.lock().await);
        Ok(result)
    }
}

fn audit_object(auditor: &dyn SecurityAuditor, obj: &Value) -> Result<Vec<Issue>> {
    let manifest = serde_json::to_vec(obj).context("failed to serialize manifest")?;
    auditor.audit_one(&manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::auditor::MockSecurityAuditor;
    use crate::scanner::{BasicAuditor, Severity};
    use serde_json::json;

    fn pod(name: &str, privileged: bool) -> Value {
        json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {"name": name, "namespace": "default"},
            "spec": {"containers": [{
                "name": "app",
                "image": "app:1.0",
                "securityContext": {"privileged": privileged},
                "resources": {"limits": {"cpu": "1"}}
            }]}
        })
    }

    #[tokio::test]
    async fn test_scan_merges_concurrent_findings() {
        let aggregator = ScanAggregator::new(Arc::new(BasicAuditor));
        let result = aggregator
            .scan("prod", vec![pod("a", true), pod("b", true), pod("c", false)], true)
            .await
            .unwrap();

        assert_eq!(result.resource_total(), 3);
        assert_eq!(result.issue_total(), 2);
        assert_eq!(result.severity_sum(), 2 * Severity::Critical.value());
    }

    #[tokio::test]
    async fn test_overlapping_batches_do_not_double_count() {
        let aggregator = ScanAggregator::new(Arc::new(BasicAuditor));
        let result = aggregator
            .scan("prod", vec![pod("a", true), pod("a", true)], true)
            .await
            .unwrap();

        assert_eq!(result.resource_total(), 1);
        assert_eq!(result.issue_total(), 1);
    }

    #[tokio::test]
    async fn test_cached_resource_skips_rescan() {
        let mut auditor = MockSecurityAuditor::new();
        auditor.expect_audit_one().times(1).returning(|_| Ok(Vec::new()));

        let aggregator = ScanAggregator::new(Arc::new(auditor));
        aggregator
            .scan("prod", vec![pod("a", false)], false)
            .await
            .unwrap();
        // second scan of the same resource is served from the cache
        let result = aggregator
            .scan("prod", vec![pod("a", false)], false)
            .await
            .unwrap();
        assert_eq!(result.resource_total(), 1);
    }

    #[tokio::test]
    async fn test_no_cache_forces_rescan() {
        let mut auditor = MockSecurityAuditor::new();
        auditor.expect_audit_one().times(2).returning(|_| Ok(Vec::new()));

        let aggregator = ScanAggregator::new(Arc::new(auditor));
        aggregator.scan("prod", vec![pod("a", false)], false).await.unwrap();
        aggregator.scan("prod", vec![pod("a", false)], true).await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_error_fails_the_batch() {
        let mut auditor = MockSecurityAuditor::new();
        auditor
            .expect_audit_one()
            .returning(|_| Err(anyhow!("scanner exploded")));

        let aggregator = ScanAggregator::new(Arc::new(auditor));
        let err = aggregator
            .scan("prod", vec![pod("a", false)], true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("scanning"));
    }

    #[tokio::test]
    async fn test_worker_panic_is_reported_not_propagated() {
        let mut auditor = MockSecurityAuditor::new();
        auditor
            .expect_audit_one()
            .returning(|_| panic!("auditor bug"));

        let aggregator = ScanAggregator::new(Arc::new(auditor));
        let err = aggregator
            .scan("prod", vec![pod("a", false)], true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }
}
