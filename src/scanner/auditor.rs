//! Security auditor boundary and the baseline implementation

use super::{Issue, Severity};
use anyhow::{Context, Result};
use serde_json::Value;

/// A pluggable security auditor.
///
/// One call audits one manifest and returns its findings; implementations
/// are stateless per call.
#[cfg_attr(test, mockall::automock)]
pub trait SecurityAuditor: Send + Sync {
    fn audit_one(&self, manifest: &[u8]) -> Result<Vec<Issue>>;
}

const SCANNER_NAME: &str = "baseline";

/// Baseline workload checks: privileged and root containers, host
/// namespaces, hostPath volumes, floating image tags and missing resource
/// limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuditor;

impl SecurityAuditor for BasicAuditor {
    fn audit_one(&self, manifest: &[u8]) -> Result<Vec<Issue>> {
        let obj: Value =
            serde_json::from_slice(manifest).context("manifest is not valid JSON")?;
        let mut issues = Vec::new();

        let Some(pod_spec) = pod_spec(&obj) else {
            // no pod template, nothing to check
            return Ok(issues);
        };

        if flag(pod_spec, "hostNetwork") {
            issues.push(Issue::new(
                SCANNER_NAME,
                Severity::High,
                "HostNetworkEnabled",
                "pod shares the node network namespace",
            ));
        }
        if flag(pod_spec, "hostPID") {
            issues.push(Issue::new(
                SCANNER_NAME,
                Severity::High,
                "HostPIDEnabled",
                "pod shares the node process namespace",
            ));
        }

        if let Some(volumes) = pod_spec.get("volumes").and_then(Value::as_array) {
            for volume in volumes {
                if volume.get("hostPath").is_some() {
                    let name = volume.get("name").and_then(Value::as_str).unwrap_or("?");
                    issues.push(Issue::new(
                        SCANNER_NAME,
                        Severity::High,
                        "HostPathVolume",
                        format!("volume {name} mounts a node path"),
                    ));
                }
            }
        }

        for container in containers(pod_spec) {
            let name = container.get("name").and_then(Value::as_str).unwrap_or("?");
            let security = container.get("securityContext");

            if security
                .and_then(|s| s.get("privileged"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                issues.push(Issue::new(
                    SCANNER_NAME,
                    Severity::Critical,
                    "PrivilegedContainer",
                    format!("container {name} runs privileged"),
                ));
            }
            if security
                .and_then(|s| s.get("runAsUser"))
                .and_then(Value::as_u64)
                == Some(0)
            {
                issues.push(Issue::new(
                    SCANNER_NAME,
                    Severity::High,
                    "RunAsRoot",
                    format!("container {name} runs as uid 0"),
                ));
            }

            if let Some(image) = container.get("image").and_then(Value::as_str) {
                if !image.contains(':') || image.ends_with(":latest") {
                    issues.push(Issue::new(
                        SCANNER_NAME,
                        Severity::Low,
                        "FloatingImageTag",
                        format!("container {name} uses a floating image tag ({image})"),
                    ));
                }
            }

            if container
                .get("resources")
                .and_then(|r| r.get("limits"))
                .is_none()
            {
                issues.push(Issue::new(
                    SCANNER_NAME,
                    Severity::Medium,
                    "MissingResourceLimits",
                    format!("container {name} has no resource limits"),
                ));
            }
        }

        Ok(issues)
    }
}

/// The pod spec of a manifest: bare pods, workload templates and cron job
/// templates are all supported.
fn pod_spec(obj: &Value) -> Option<&Value> {
    let spec = obj.get("spec")?;
    if let Some(template_spec) = spec.get("template").and_then(|t| t.get("spec")) {
        return Some(template_spec);
    }
    if let Some(job_spec) = spec
        .get("jobTemplate")
        .and_then(|j| j.get("spec"))
        .and_then(|s| s.get("template"))
        .and_then(|t| t.get("spec"))
    {
        return Some(job_spec);
    }
    if obj.get("kind").and_then(Value::as_str) == Some("Pod") {
        return Some(spec);
    }
    None
}

fn containers(pod_spec: &Value) -> impl Iterator<Item = &Value> {
    ["containers", "initContainers"]
        .into_iter()
        .filter_map(|field| pod_spec.get(field).and_then(Value::as_array))
        .flatten()
}

fn flag(pod_spec: &Value, field: &str) -> bool {
    pod_spec.get(field).and_then(Value::as_bool).unwrap_or(false)
}
