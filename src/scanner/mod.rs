//! Security scan results
//!
//! Findings and the deduplicated bidirectional indexes they are merged
//! into, plus the concurrent aggregator and scoring on top of them.

mod aggregator;
mod auditor;
mod score;

pub use aggregator::ScanAggregator;
pub use auditor::{BasicAuditor, SecurityAuditor};
pub use score::{ScoreSummary, resource_score, summarize};

use crate::models::ResourceGroup;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Ordinal risk level of a finding.
///
/// The numeric gap between `High` and `Critical` is deliberate: critical
/// findings weigh disproportionately in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Ordinal value used by the scoring curve
    pub fn value(self) -> u32 {
        match self {
            Severity::Safe => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Safe => "Safe",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

/// A single finding reported by a scanner.
///
/// Issues are value types: two issues with identical fields are the same
/// issue for indexing purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    pub scanner: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Issue {
    pub fn new(
        scanner: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scanner: scanner.into(),
            severity,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// An issue with every resource it was found on; the serializable view of
/// one `by_issue` entry
#[derive(Debug, Clone, Serialize)]
pub struct IssueGroup {
    pub issue: Issue,
    pub resources: Vec<ResourceGroup>,
}

/// Deduplicated scan findings, indexed both by issue and by resource.
///
/// The two indexes always describe the same facts: a dedicated relation
/// set keeps a finding from being recorded twice for the same resource,
/// even when the resource is scanned more than once.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    by_issue: HashMap<Issue, Vec<ResourceGroup>>,
    by_resource: HashMap<String, Vec<Issue>>,
    resources: HashMap<String, ResourceGroup>,
    recorded: HashSet<(Issue, String)>,
}

impl ScanResult {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the findings for one resource.
    ///
    /// The resource is registered even with no findings, so clean resources
    /// count toward scoring. Recording an already-known (issue, resource)
    /// pair is a no-op.
    pub fn add(&mut self, resource: &ResourceGroup, issues: &[Issue]) {
        let key = resource.hash();
        self.resources
            .entry(key.clone())
            .or_insert_with(|| resource.clone());
        self.by_resource.entry(key.clone()).or_default();

        for issue in issues {
            if !self.recorded.insert((issue.clone(), key.clone())) {
                continue;
            }
            self.by_issue
                .entry(issue.clone())
                .or_default()
                .push(resource.clone());
            self.by_resource
                .entry(key.clone())
                .or_default()
                .push(issue.clone());
        }

        debug_assert_eq!(
            self.by_issue.values().map(Vec::len).sum::<usize>(),
            self.by_resource.values().map(Vec::len).sum::<usize>(),
        );
    }

    /// Fold another result into this one.
    ///
    /// Pagination windows may overlap; the relation set keeps the merge
    /// idempotent.
    pub fn merge(&mut self, other: &ScanResult) {
        for (key, issues) in &other.by_resource {
            if let Some(resource) = other.resources.get(key) {
                self.add(resource, issues);
            }
        }
    }

    /// Total recorded findings, summed over the by-resource index
    pub fn issue_total(&self) -> usize {
        self.by_resource.values().map(Vec::len).sum()
    }

    /// Number of distinct resources seen by the scan
    pub fn resource_total(&self) -> usize {
        self.resources.len()
    }

    /// Sum of severity values over all recorded findings
    pub fn severity_sum(&self) -> u32 {
        self.by_resource
            .values()
            .flatten()
            .map(|issue| issue.severity.value())
            .sum()
    }

    /// Finding count per severity label
    pub fn severity_statistic(&self) -> BTreeMap<String, usize> {
        let mut statistic = BTreeMap::new();
        for issue in self.by_resource.values().flatten() {
            *statistic
                .entry(issue.severity.as_str().to_string())
                .or_default() += 1;
        }
        statistic
    }

    /// Issues recorded for one resource, by its scope hash
    pub fn issues_for(&self, resource_hash: &str) -> &[Issue] {
        self.by_resource
            .get(resource_hash)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All issues with their affected resources, most severe first
    pub fn issue_groups(&self) -> Vec<IssueGroup> {
        let mut groups: Vec<IssueGroup> = self
            .by_issue
            .iter()
            .map(|(issue, resources)| IssueGroup {
                issue: issue.clone(),
                resources: resources.clone(),
            })
            .collect();
        groups.sort_by(|a, b| {
            b.issue
                .severity
                .cmp(&a.issue.severity)
                .then_with(|| a.issue.title.cmp(&b.issue.title))
        });
        groups
    }

    /// Whether the scan saw no resources at all
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str) -> ResourceGroup {
        ResourceGroup {
            cluster: "prod".to_string(),
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            namespace: "default".to_string(),
            name: name.to_string(),
            ..ResourceGroup::default()
        }
    }

    fn issue(title: &str, severity: Severity) -> Issue {
        Issue::new("baseline", severity, title, "details")
    }

    #[test]
    fn test_severity_values() {
        assert_eq!(Severity::Safe.value(), 0);
        assert_eq!(Severity::Low.value(), 1);
        assert_eq!(Severity::Medium.value(), 2);
        assert_eq!(Severity::High.value(), 3);
        assert_eq!(Severity::Critical.value(), 5);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut result = ScanResult::new();
        let pod = resource("web-0");
        let findings = vec![issue("PrivilegedContainer", Severity::Critical)];

        result.add(&pod, &findings);
        let total = result.issue_total();
        result.add(&pod, &findings);

        assert_eq!(result.issue_total(), total);
        assert_eq!(result.resource_total(), 1);
    }

    #[test]
    fn test_indexes_stay_consistent() {
        let mut result = ScanResult::new();
        let shared = issue("MissingLimits", Severity::Medium);
        result.add(&resource("a"), &[shared.clone(), issue("HostPath", Severity::High)]);
        result.add(&resource("b"), &[shared]);

        let by_issue: usize = result.by_issue.values().map(Vec::len).sum();
        let by_resource: usize = result.by_resource.values().map(Vec::len).sum();
        assert_eq!(by_issue, by_resource);
        assert_eq!(result.issue_total(), 3);
    }

    #[test]
    fn test_clean_resource_counts_toward_totals() {
        let mut result = ScanResult::new();
        result.add(&resource("clean"), &[]);
        assert_eq!(result.resource_total(), 1);
        assert_eq!(result.issue_total(), 0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut batch = ScanResult::new();
        batch.add(&resource("a"), &[issue("HostPath", Severity::High)]);

        let mut accumulator = ScanResult::new();
        accumulator.merge(&batch);
        accumulator.merge(&batch);

        assert_eq!(accumulator.issue_total(), 1);
        assert_eq!(accumulator.resource_total(), 1);
    }

    #[test]
    fn test_issue_groups_sorted_by_severity() {
        let mut result = ScanResult::new();
        result.add(
            &resource("a"),
            &[
                issue("LatestTag", Severity::Low),
                issue("Privileged", Severity::Critical),
            ],
        );

        let groups = result.issue_groups();
        assert_eq!(groups[0].issue.title, "Privileged");
        assert_eq!(groups[1].issue.title, "LatestTag");
    }

    #[test]
    fn test_severity_statistic() {
        let mut result = ScanResult::new();
        result.add(
            &resource("a"),
            &[
                issue("x", Severity::High),
                issue("y", Severity::High),
                issue("z", Severity::Low),
            ],
        );
        let statistic = result.severity_statistic();
        assert_eq!(statistic.get("High"), Some(&2));
        assert_eq!(statistic.get("Low"), Some(&1));
        assert_eq!(statistic.get("Critical"), None);
    }
}
