//! Health scoring over scan results

use super::ScanResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Exponential decay weights. Severity dominates issue count: three High
/// findings score lower than ten Low findings.
const ISSUE_WEIGHT: f64 = -0.04;
const SEVERITY_WEIGHT: f64 = -0.06;

/// Score a resource set: `100 * exp(a*P + b*S)` where `P` is the issue
/// count and `S` the severity sum
pub fn resource_score(issue_count: usize, severity_sum: u32) -> f64 {
    100.0
        * (ISSUE_WEIGHT * issue_count as f64 + SEVERITY_WEIGHT * f64::from(severity_sum)).exp()
}

/// Aggregate score summary for a scan result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub score: f64,
    pub resource_total: usize,
    pub issues_total: usize,
    pub severity_statistic: BTreeMap<String, usize>,
}

/// Summarize a scan result.
///
/// An empty result set scores 0 and never divides by zero.
pub fn summarize(result: &ScanResult) -> ScoreSummary {
    let resource_total = result.resource_total();
    let issues_total = result.issue_total();
    let score = if resource_total == 0 {
        0.0
    } else {
        resource_score(issues_total, result.severity_sum())
    };
    ScoreSummary {
        score,
        resource_total,
        issues_total,
        severity_statistic: result.severity_statistic(),
    }
}
