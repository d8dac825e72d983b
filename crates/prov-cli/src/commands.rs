use std::sync::Arc;

use anyhow::{Context, Result};
use prov_config::Settings;
use prov_domain::{Action, ClusterId, TaskState};
use prov_executor::{Executor, ExecutorConfig};
use prov_graph::GraphBuilder;
use prov_provider::{AwsProvider, AwsProviderConfig, LocalProvider, Provider};
use prov_store::{InMemoryStore, PostgresStore, Store};
use serde_json::json;
use uuid::Uuid;

/// Builds the store named by `settings`. Without `PROV_DATABASE_URL` this
/// is an in-memory store scoped to the current process — fine for trying
/// the engine out, useless across separate CLI invocations, since nothing
/// survives process exit. `serve` is the only subcommand where that
/// limitation doesn't bite, since it keeps the store alive for its
/// lifetime.
async fn open_store(settings: &Settings) -> Result<Arc<dyn Store>> {
    match &settings.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await.context("connecting to Postgres")?;
            store.migrate().await.context("running migrations")?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

fn open_provider(settings: &Settings) -> Result<Arc<dyn Provider>> {
    match AwsProviderConfig::from_env() {
        Ok(config) => Ok(Arc::new(AwsProvider::new(config))),
        Err(_) => {
            let _ = &settings.aws_region;
            Ok(Arc::new(LocalProvider::new()))
        }
    }
}

pub async fn create(name: String, n_nodes: usize, n_dcs: usize) -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let (cluster_id, graph) = GraphBuilder::create(store.as_ref(), &name, n_nodes, n_dcs).await?;
    println!("created cluster {cluster_id} with {} nodes", graph.len());
    Ok(())
}

pub async fn provision(cluster_id: Uuid) -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let provider = open_provider(&settings)?;
    run_phase(store, provider, ClusterId::from_uuid(cluster_id), Action::Provision).await
}

/// Marks every `PROVISIONED` node for deletion, then drives the delete
/// loop against the same store handle — a fresh in-memory store would
/// have forgotten the marks made a line above, so the handle must be
/// shared rather than reopened.
pub async fn delete(cluster_id: Uuid) -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let provider = open_provider(&settings)?;
    let cluster_id = ClusterId::from_uuid(cluster_id);

    for node in store.list_nodes(cluster_id).await? {
        if node.state == TaskState::Provisioned {
            store.set_state(node.id, TaskState::PendingDeletion).await?;
        }
    }
    run_phase(store, provider, cluster_id, Action::Delete).await
}

async fn run_phase(store: Arc<dyn Store>, provider: Arc<dyn Provider>, cluster_id: ClusterId, phase: Action) -> Result<()> {
    let executor = Executor::new(ExecutorConfig::new(phase));
    executor.run(store, provider, cluster_id).await?;
    println!("{phase:?} complete for cluster {cluster_id}");
    Ok(())
}

pub async fn status(cluster_id: Uuid) -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let (_, graph) = GraphBuilder::read(store.as_ref(), ClusterId::from_uuid(cluster_id)).await?;
    println!("{}", graph.info(Action::Provision));
    Ok(())
}

pub async fn graph(cluster_id: Uuid) -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let cluster_id = ClusterId::from_uuid(cluster_id);
    let nodes = store.list_nodes(cluster_id).await?;
    let edges = store.list_edges(cluster_id).await?;
    let rendered = json!({
        "cluster_id": cluster_id,
        "nodes": nodes.iter().map(|n| json!({
            "id": n.id,
            "task_type": n.task_type,
            "state": n.state,
        })).collect::<Vec<_>>(),
        "edges": edges.iter().map(|e| json!({ "from": e.from_node, "to": e.to_node })).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

pub async fn serve() -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let provider = open_provider(&settings)?;
    let auth_token = Arc::new(
        settings
            .api_token
            .clone()
            .context("PROV_API_TOKEN must be set to serve")?,
    );

    let app = prov_api::build_app(store, provider, auth_token);
    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", settings.bind_addr))?;
    tracing::info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
