//! klens - security audit and topology insight for Kubernetes clusters
//!
//! Wires the kubeconfig-default client, the embedded relationship schema
//! and the baseline auditor into the engine's query operations, printing
//! results as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use klens::cli::{Args, Command, init_logging};
use klens::kube::{KubeDiscovery, KubeResourceClient};
use klens::models::ResourceGroup;
use klens::relationship::DEFAULT_SCHEMA;
use klens::scanner::BasicAuditor;
use klens::services::{AuditService, TopologyService};
use serde::Serialize;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let schema = match &args.schema {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema file {}", path.display()))?,
        None => DEFAULT_SCHEMA.to_string(),
    };

    let client = kube::Client::try_default()
        .await
        .context("failed to build Kubernetes client")?;
    let resource_client = Arc::new(KubeResourceClient::new(client.clone()));
    let discovery = Arc::new(KubeDiscovery::new(client));

    match args.command {
        Command::ClusterTopology { namespace } => {
            let service = TopologyService::new(resource_client, discovery, &schema)?;
            let topology = service
                .get_topology_for_cluster(&args.cluster, namespace.as_deref(), args.no_cache)
                .await?;
            print_json(&topology)
        }
        Command::Topology {
            api_version,
            kind,
            name,
            namespace,
        } => {
            let service = TopologyService::new(resource_client, discovery, &schema)?;
            let scope = ResourceGroup {
                cluster: args.cluster,
                api_version,
                kind,
                namespace: namespace.unwrap_or_default(),
                name,
                ..ResourceGroup::default()
            };
            let topology = service
                .get_topology_for_resource(&scope, args.no_cache)
                .await?;
            print_json(&topology)
        }
        Command::Audit {
            api_version,
            kind,
            namespace,
            name,
        } => {
            let service = AuditService::new(resource_client, Arc::new(BasicAuditor));
            let scope = ResourceGroup {
                cluster: args.cluster,
                api_version,
                kind,
                namespace: namespace.unwrap_or_default(),
                name: name.unwrap_or_default(),
                ..ResourceGroup::default()
            };
            let result = service.audit(&scope, args.no_cache).await?;
            print_json(&result.issue_groups())
        }
        Command::Score {
            api_version,
            kind,
            namespace,
            name,
        } => {
            let service = AuditService::new(resource_client, Arc::new(BasicAuditor));
            let scope = ResourceGroup {
                cluster: args.cluster,
                api_version,
                kind,
                namespace: namespace.unwrap_or_default(),
                name: name.unwrap_or_default(),
                ..ResourceGroup::default()
            };
            let summary = service.score(&scope, args.no_cache).await?;
            print_json(&summary)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize result")?
    );
    Ok(())
}
