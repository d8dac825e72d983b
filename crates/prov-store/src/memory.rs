use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use prov_domain::{ClusterId, DataCentreId, NodeId, Payload, TaskState, TaskType};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{EdgeRow, NodeRow, Store};

#[derive(Default)]
struct Inner {
    cluster_names: HashMap<ClusterId, String>,
    data_centres: HashMap<DataCentreId, ClusterId>,
    nodes: HashMap<NodeId, NodeRow>,
    edges: Vec<EdgeRow>,
}

/// An in-process store backed by a `RwLock`, used by tests and by the CLI's
/// `--store memory` mode. Nothing here survives the process — that's the
/// point; it exists so the rest of the workspace can be tested without a
/// database.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_cluster(&self, name: &str) -> Result<ClusterId, StoreError> {
        let id = ClusterId::new();
        self.inner
            .write()
            .await
            .cluster_names
            .insert(id, name.to_string());
        Ok(id)
    }

    async fn insert_data_centre(&self, cluster: ClusterId) -> Result<DataCentreId, StoreError> {
        let id = DataCentreId::new();
        self.inner.write().await.data_centres.insert(id, cluster);
        Ok(id)
    }

    async fn insert_node(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        task_type: TaskType,
        state: TaskState,
    ) -> Result<NodeId, StoreError> {
        let id = NodeId::new();
        let row = NodeRow {
            id,
            task_type,
            cluster,
            data_centre,
            state,
            payload: prov_domain::empty_payload(),
        };
        self.inner.write().await.nodes.insert(id, row);
        Ok(id)
    }

    async fn insert_edge(
        &self,
        _cluster: ClusterId,
        _data_centre: Option<DataCentreId>,
        from_node: NodeId,
        to_node: NodeId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let edge = EdgeRow { from_node, to_node };
        if !inner.edges.contains(&edge) {
            inner.edges.push(edge);
        }
        Ok(())
    }

    async fn list_nodes(&self, cluster: ClusterId) -> Result<Vec<NodeRow>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .nodes
            .values()
            .filter(|n| n.cluster == cluster)
            .cloned()
            .collect())
    }

    async fn list_edges(&self, cluster: ClusterId) -> Result<Vec<EdgeRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .edges
            .iter()
            .filter(|e| {
                inner
                    .nodes
                    .get(&e.from_node)
                    .map(|n| n.cluster == cluster)
                    .unwrap_or(false)
            })
            .copied()
            .collect())
    }

    async fn get_node(&self, node: NodeId) -> Result<NodeRow, StoreError> {
        self.inner
            .read()
            .await
            .nodes
            .get(&node)
            .cloned()
            .ok_or_else(|| StoreError::NodeNotFound(node.to_string()))
    }

    async fn set_state(&self, node: NodeId, state: TaskState) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .nodes
            .get_mut(&node)
            .ok_or_else(|| StoreError::NodeNotFound(node.to_string()))?;
        row.state = state;
        Ok(())
    }

    async fn set_payload(&self, node: NodeId, payload: Payload) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .nodes
            .get_mut(&node)
            .ok_or_else(|| StoreError::NodeNotFound(node.to_string()))?;
        row.payload = payload;
        Ok(())
    }

    async fn parent_rows(&self, node: NodeId) -> Result<Vec<NodeRow>, StoreError> {
        let inner = self.inner.read().await;
        let parent_ids: Vec<NodeId> = inner
            .edges
            .iter()
            .filter(|e| e.to_node == node)
            .map(|e| e.from_node)
            .collect();
        Ok(parent_ids
            .into_iter()
            .filter_map(|id| inner.nodes.get(&id).cloned())
            .collect())
    }

    async fn find_node_in_data_centre(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        task_type: TaskType,
    ) -> Result<Option<NodeRow>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .nodes
            .values()
            .find(|n| n.cluster == cluster && n.data_centre == data_centre && n.task_type == task_type)
            .cloned())
    }
}
