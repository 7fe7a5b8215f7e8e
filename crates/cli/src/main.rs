//! Mesh stats CLI
//!
//! A command-line client for the stats API: traffic statistics and mesh
//! coverage for deployments, namespaces, pods, replication controllers and
//! services.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{pods, stat};

/// Mesh stats CLI
#[derive(Parser)]
#[command(name = "meshstat")]
#[command(author, version, about = "Traffic statistics for service mesh workloads", long_about = None)]
pub struct Cli {
    /// Stats API URL (can also be set via MESHSTAT_API_URL env var)
    #[arg(long, env = "MESHSTAT_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show request volume, success rate and latency per resource
    Stat(StatArgs),

    /// List the pods behind resources with their mesh status
    Pods(PodsArgs),
}

#[derive(Args)]
pub struct StatArgs {
    /// Resource type, optionally with a name (e.g. deploy or deploy/web)
    pub resource: String,

    /// Resource name
    pub name: Option<String>,

    /// Namespace of the resources
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Show resources across all namespaces
    #[arg(long, conflicts_with = "namespace")]
    pub all_namespaces: bool,

    /// Time window for the statistics (e.g. 30s, 1m, 1h)
    #[arg(long, short = 't')]
    pub time_window: Option<String>,

    /// Only count traffic sent to this resource (type[/name])
    #[arg(long, conflicts_with = "from")]
    pub to: Option<String>,

    /// Namespace of the --to resource
    #[arg(long)]
    pub to_namespace: Option<String>,

    /// Only count traffic received from this resource (type[/name])
    #[arg(long)]
    pub from: Option<String>,

    /// Namespace of the --from resource
    #[arg(long)]
    pub from_namespace: Option<String>,
}

#[derive(Args)]
pub struct PodsArgs {
    /// Resource type, optionally with a name (e.g. deploy or deploy/web)
    pub resource: String,

    /// Resource name
    pub name: Option<String>,

    /// Namespace of the resources
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Show resources across all namespaces
    #[arg(long, conflicts_with = "namespace")]
    pub all_namespaces: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = config.api_url(cli.api_url.as_deref());
    if cli.verbose {
        output::print_info(&format!("Using stats API at {}", api_url));
    }
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Stat(args) => {
            let options = stat::StatOptions {
                resource: args.resource,
                name: args.name,
                namespace: args.namespace.or_else(|| config.default_namespace.clone()),
                all_namespaces: args.all_namespaces,
                time_window: args.time_window.or_else(|| config.default_window.clone()),
                to: args.to,
                to_namespace: args.to_namespace,
                from: args.from,
                from_namespace: args.from_namespace,
            };
            stat::show_stats(&client, &options, cli.format).await?;
        }
        Commands::Pods(args) => {
            pods::show_pods(
                &client,
                &args.resource,
                args.name.as_deref(),
                args.namespace.or_else(|| config.default_namespace.clone()),
                args.all_namespaces,
                cli.format,
            )
            .await?;
        }
    }

    Ok(())
}
