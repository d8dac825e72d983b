use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use prov_domain::{Action, ClusterId, TaskState};
use prov_executor::{Executor, ExecutorConfig};
use prov_graph::GraphBuilder;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct CreateClusterBody {
    pub name: String,
    pub n_nodes: usize,
    pub n_dcs: usize,
}

pub async fn create_cluster(
    State(state): State<AppState>,
    Json(body): Json<CreateClusterBody>,
) -> Result<Json<Value>, ApiError> {
    let (cluster_id, graph) =
        GraphBuilder::create(state.store.as_ref(), &body.name, body.n_nodes, body.n_dcs).await?;
    Ok(Json(json!({ "cluster_id": cluster_id, "node_count": graph.len() })))
}

#[derive(Debug, Deserialize)]
pub struct RunBody {
    pub phase: String,
}

/// Kicks off a provision or delete run in the background and returns
/// immediately; poll `GET /clusters/:id/status` to watch progress. A run
/// already in flight against the same cluster is harmless but wasteful —
/// both loops converge on the same store, the second simply has nothing
/// left to do once the first finishes.
pub async fn run_cluster_phase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RunBody>,
) -> Result<StatusCode, ApiError> {
    run_cluster_with_body(state, id, body).await
}

async fn run_cluster_with_body(state: AppState, id: String, body: RunBody) -> Result<StatusCode, ApiError> {
    let cluster_id = parse_cluster_id(&id)?;
    let phase = match body.phase.to_lowercase().as_str() {
        "provision" => Action::Provision,
        "delete" => Action::Delete,
        other => return Err(ApiError::bad_request(format!("unknown phase {other:?}"))),
    };

    let store = state.store.clone();
    let provider = state.provider.clone();
    tokio::spawn(async move {
        info!(%cluster_id, ?phase, "starting run");
        let executor = Executor::new(ExecutorConfig::new(phase));
        if let Err(e) = executor.run(store, provider, cluster_id).await {
            error!(%cluster_id, ?phase, error = %e, "run aborted");
        }
    });

    Ok(StatusCode::ACCEPTED)
}

pub async fn get_status(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let cluster_id = parse_cluster_id(&id)?;
    let (_, graph) = GraphBuilder::read(state.store.as_ref(), cluster_id).await?;

    let mut by_state: HashMap<String, usize> = HashMap::new();
    for state_kind in [
        TaskState::PendingProvision,
        TaskState::Provisioning,
        TaskState::Provisioned,
        TaskState::PendingDeletion,
        TaskState::Deleting,
        TaskState::Deleted,
        TaskState::Failed,
    ] {
        by_state.insert(state_kind.to_string(), graph.nodes_in_state(state_kind).len());
    }

    Ok(Json(json!({
        "cluster_id": cluster_id,
        "node_count": graph.len(),
        "by_state": by_state,
        "percent_provisioned": graph.percent_complete(Action::Provision),
        "percent_deleted": graph.percent_complete(Action::Delete),
    })))
}

pub async fn get_graph(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let cluster_id = parse_cluster_id(&id)?;
    let nodes = state.store.list_nodes(cluster_id).await?;
    let edges = state.store.list_edges(cluster_id).await?;

    let node_json: Vec<Value> = nodes
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "task_type": n.task_type,
                "state": n.state,
                "data_centre": n.data_centre,
                "payload": n.payload,
            })
        })
        .collect();
    let edge_json: Vec<Value> = edges
        .iter()
        .map(|e| json!({ "from": e.from_node, "to": e.to_node }))
        .collect();

    Ok(Json(json!({ "cluster_id": cluster_id, "nodes": node_json, "edges": edge_json })))
}

fn parse_cluster_id(raw: &str) -> Result<ClusterId, ApiError> {
    uuid::Uuid::from_str(raw)
        .map(ClusterId::from_uuid)
        .map_err(|_| ApiError::bad_request(format!("invalid cluster id {raw:?}")))
}
