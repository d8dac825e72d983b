use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "prov", about = "Dependency-ordered cloud infrastructure provisioning", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new cluster topology (does not provision it).
    Create {
        name: String,
        #[arg(long, default_value_t = 1)]
        n_nodes: usize,
        #[arg(long, default_value_t = 1)]
        n_dcs: usize,
    },

    /// Run the provisioning loop for a cluster to completion.
    Provision { cluster_id: Uuid },

    /// Mark every node for deletion and run the delete loop to completion.
    Delete { cluster_id: Uuid },

    /// Print per-state node counts for a cluster.
    Status { cluster_id: Uuid },

    /// Print the cluster's nodes and edges as JSON.
    Graph { cluster_id: Uuid },

    /// Start the HTTP API server.
    Serve,
}
