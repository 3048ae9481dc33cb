//! Cache-fronted orchestration facades
//!
//! Thin services that hash the query scope, probe the TTL cache, and on a
//! miss drive the counting pass, the live resolver or the scan aggregator.
//! A hit never mutates the cache; errors from the underlying computation
//! are never suppressed.

mod audit_service;
mod topology_service;

pub use audit_service::AuditService;
pub use topology_service::{ClusterTopologyEntry, TopologyService};

use std::time::Duration;

/// Default TTL for cached topology and audit results
pub(crate) const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(10 * 60);
