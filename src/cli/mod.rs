//! Command-line interface
//!
//! Argument parsing and logging setup for the `klens` binary. Logs go to
//! stderr so stdout stays clean for JSON output.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// klens - security audit and topology insight for Kubernetes clusters
#[derive(Parser, Debug)]
#[command(name = "klens")]
#[command(about = "Security audit and topology insight engine for Kubernetes clusters", long_about = None)]
pub struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Logical cluster name recorded in result identities
    #[arg(long, default_value = "default")]
    pub cluster: String,

    /// Relationship schema file (defaults to the embedded schema)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Bypass the result cache
    #[arg(long)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Kind-level topology of the cluster with live resource counts
    ClusterTopology {
        /// Restrict counting to one namespace
        #[arg(long, short = 'n')]
        namespace: Option<String>,
    },
    /// Instance-level topology around one resource
    Topology {
        /// apiVersion of the resource (e.g. "apps/v1")
        api_version: String,
        /// Kind of the resource (e.g. "Deployment")
        kind: String,
        /// Name of the resource
        name: String,
        /// Namespace of the resource
        #[arg(long, short = 'n')]
        namespace: Option<String>,
    },
    /// Audit resources and print the findings
    Audit {
        /// apiVersion of the resources (e.g. "apps/v1")
        api_version: String,
        /// Kind of the resources (e.g. "Deployment")
        kind: String,
        /// Namespace to audit; all namespaces when omitted
        #[arg(long, short = 'n')]
        namespace: Option<String>,
        /// Audit a single resource by name
        #[arg(long)]
        name: Option<String>,
    },
    /// Aggregate health score for the audited resources
    Score {
        /// apiVersion of the resources (e.g. "apps/v1")
        api_version: String,
        /// Kind of the resources (e.g. "Deployment")
        kind: String,
        /// Namespace to score; all namespaces when omitted
        #[arg(long, short = 'n')]
        namespace: Option<String>,
        /// Score a single resource by name
        #[arg(long)]
        name: Option<String>,
    },
}

/// Initialize logging based on debug flag
pub fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_ansi(false)
        .init();
}
