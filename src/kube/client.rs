//! kube-backed collaborator implementations
//!
//! Resolves kinds to dynamic APIs through server discovery and converts
//! every object to a schema-less JSON document before it enters the engine.

use super::{ClientError, DiscoveryProvider, ResourceClient};
use crate::models::GroupVersionKind;
use anyhow::Context;
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::{self, Scope};
use serde_json::Value;

/// Cluster resource client backed by the dynamic Kubernetes API
pub struct KubeResourceClient {
    client: kube::Client,
}

impl KubeResourceClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Resolve a dynamic API for the kind, honoring its discovered scope.
    ///
    /// A namespace is only applied when the server reports the kind as
    /// namespaced.
    async fn dynamic_api(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Api<DynamicObject>, ClientError> {
        let kube_gvk =
            kube::core::GroupVersionKind::gvk(&gvk.group, &gvk.version, &gvk.kind);
        let (resource, capabilities) = discovery::pinned_kind(&self.client, &kube_gvk)
            .await
            .map_err(|e| map_kube_error(e, &gvk.label()))?;

        let api = match namespace {
            Some(ns) if matches!(capabilities.scope, Scope::Namespaced) => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        };
        Ok(api)
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn list<'a>(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&'a str>,
    ) -> Result<Vec<Value>, ClientError> {
        let api = self.dynamic_api(gvk, namespace).await?;
        let objects = api
            .list(&ListParams::default())
            .await
            .map_err(|e| map_kube_error(e, &gvk.label()))?;

        let mut values = Vec::with_capacity(objects.items.len());
        for obj in objects.items {
            let mut value = serde_json::to_value(&obj)
                .context("failed to serialize object to JSON")
                .map_err(ClientError::Other)?;
            ensure_type_meta(&mut value, gvk);
            values.push(value);
        }
        Ok(values)
    }

    async fn get<'a>(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&'a str>,
        name: &str,
    ) -> Result<Value, ClientError> {
        let api = self.dynamic_api(gvk, namespace).await?;
        let obj = api
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, &format!("{} {}", gvk.label(), name)))?;

        let mut value = serde_json::to_value(&obj)
            .context("failed to serialize object to JSON")
            .map_err(ClientError::Other)?;
        ensure_type_meta(&mut value, gvk);
        Ok(value)
    }
}

/// Discovery provider backed by server discovery
pub struct KubeDiscovery {
    client: kube::Client,
}

impl KubeDiscovery {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiscoveryProvider for KubeDiscovery {
    async fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, ClientError> {
        let kube_gvk =
            kube::core::GroupVersionKind::gvk(&gvk.group, &gvk.version, &gvk.kind);
        let (_, capabilities) = discovery::pinned_kind(&self.client, &kube_gvk)
            .await
            .map_err(|e| map_kube_error(e, &gvk.label()))?;
        Ok(matches!(capabilities.scope, Scope::Namespaced))
    }
}

/// List items come back without their TypeMeta; restore it so downstream
/// identity extraction always sees `apiVersion` and `kind`.
fn ensure_type_meta(value: &mut Value, gvk: &GroupVersionKind) {
    if let Some(obj) = value.as_object_mut() {
        obj.entry("apiVersion")
            .or_insert_with(|| Value::String(gvk.api_version()));
        obj.entry("kind")
            .or_insert_with(|| Value::String(gvk.kind.clone()));
    }
}

fn map_kube_error(err: kube::Error, what: &str) -> ClientError {
    match &err {
        kube::Error::Api(resp) if resp.code == 404 => ClientError::NotFound(what.to_string()),
        _ => ClientError::Other(
            anyhow::Error::new(err).context(format!("cluster request for {what} failed")),
        ),
    }
}
