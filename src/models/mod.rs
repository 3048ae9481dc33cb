//! Resource identity models
//!
//! Identity types shared across the engine: the group/version/kind of a
//! resource type and the `ResourceGroup` query scope whose deterministic
//! hash keys the topology and scan caches.

pub mod fields;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Group/version/kind identity of a resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Parse an `apiVersion` string (`group/version`, or bare `version` for
    /// the core group)
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// The `apiVersion` form of this identity
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Stable lookup key: `group.version.kind`, with the group segment
    /// omitted for core kinds (`v1.Pod`)
    pub fn label(&self) -> String {
        if self.group.is_empty() {
            format!("{}.{}", self.version, self.kind)
        } else {
            format!("{}.{}.{}", self.group, self.version, self.kind)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Query scope identity: cluster plus optional GVK, namespace, name and
/// label/annotation filters.
///
/// The deterministic [`hash`](ResourceGroup::hash) of a scope is the cache
/// key for topology and scan results. Filters are kept in ordered maps so
/// insertion order can never change the hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceGroup {
    pub cluster: String,
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ResourceGroup {
    /// The GVK this scope addresses
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::from_api_version(&self.api_version, &self.kind)
    }

    /// Build the scope identity of a live object.
    ///
    /// Returns `None` when the object is missing its identity fields.
    pub fn from_object(cluster: &str, obj: &serde_json::Value) -> Option<Self> {
        let api_version = obj.get("apiVersion")?.as_str()?.to_string();
        let kind = obj.get("kind")?.as_str()?.to_string();
        let name = fields::object_name(obj)?.to_string();
        let namespace = fields::object_namespace(obj).unwrap_or_default().to_string();
        Some(Self {
            cluster: cluster.to_string(),
            api_version,
            kind,
            namespace,
            name,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        })
    }

    /// Deterministic hash over all scope fields.
    ///
    /// Map entries are folded in sorted key order, so two scopes with the
    /// same field values always hash identically.
    pub fn hash(&self) -> String {
        let mut hasher = DefaultHasher::new();
        for part in [
            &self.cluster,
            &self.api_version,
            &self.kind,
            &self.namespace,
            &self.name,
        ] {
            part.hash(&mut hasher);
        }
        for (key, value) in &self.labels {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        for (key, value) in &self.annotations {
            key.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        format!("{:016x}", hasher.finish())
    }
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.cluster, self.api_version, self.kind, self.namespace, self.name
        )
    }
}
