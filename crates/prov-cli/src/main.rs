mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use prov_config::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_filter.clone())))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Create { name, n_nodes, n_dcs } => commands::create(name, n_nodes, n_dcs).await,
        Command::Provision { cluster_id } => commands::provision(cluster_id).await,
        Command::Delete { cluster_id } => commands::delete(cluster_id).await,
        Command::Status { cluster_id } => commands::status(cluster_id).await,
        Command::Graph { cluster_id } => commands::graph(cluster_id).await,
        Command::Serve => commands::serve().await,
    }
}
