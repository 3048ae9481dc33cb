//! klens core engine
//!
//! Aggregates live cluster state into security-audit findings and
//! relationship topology views: a declarative kind-level relationship graph,
//! a live instance-level resolver, a concurrent scan aggregator, and the
//! TTL cache the result facades share.

pub mod cache;
pub mod cli;
pub mod graph;
pub mod kube;
pub mod models;
pub mod relationship;
pub mod scanner;
pub mod services;
pub mod topology;

// Re-export commonly used types for convenience
pub use models::{GroupVersionKind, ResourceGroup};
pub use scanner::{Issue, ScanResult, Severity};
pub use services::{AuditService, TopologyService};
