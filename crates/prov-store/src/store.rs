use async_trait::async_trait;
use prov_domain::{ClusterId, DataCentreId, NodeId, Payload, TaskState, TaskType};

use crate::error::StoreError;

/// A persisted node row, as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub id: NodeId,
    pub task_type: TaskType,
    pub cluster: ClusterId,
    pub data_centre: Option<DataCentreId>,
    pub state: TaskState,
    pub payload: Payload,
}

/// A persisted edge row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRow {
    pub from_node: NodeId,
    pub to_node: NodeId,
}

/// Transactional row operations over `cluster` / `data_centre` / `node` /
/// `edge`. Deployment, schema migration, and connection pooling for the
/// backing relational database are this trait's caller's problem, not its
/// own — see the two implementations in this crate for where that line is
/// drawn.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_cluster(&self, name: &str) -> Result<ClusterId, StoreError>;

    async fn insert_data_centre(&self, cluster: ClusterId) -> Result<DataCentreId, StoreError>;

    async fn insert_node(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        task_type: TaskType,
        state: TaskState,
    ) -> Result<NodeId, StoreError>;

    async fn insert_edge(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        from_node: NodeId,
        to_node: NodeId,
    ) -> Result<(), StoreError>;

    /// All nodes belonging to a cluster.
    async fn list_nodes(&self, cluster: ClusterId) -> Result<Vec<NodeRow>, StoreError>;

    /// All edges belonging to a cluster, deduplicated. §4.2 notes the
    /// source computes this with a recursive CTE closure purely to
    /// deduplicate; a plain distinct read of the edge table suffices.
    async fn list_edges(&self, cluster: ClusterId) -> Result<Vec<EdgeRow>, StoreError>;

    async fn get_node(&self, node: NodeId) -> Result<NodeRow, StoreError>;

    async fn set_state(&self, node: NodeId, state: TaskState) -> Result<(), StoreError>;

    async fn set_payload(&self, node: NodeId, payload: Payload) -> Result<(), StoreError>;

    /// Join of `edge` with `node` restricted to `to_node == node`: the rows
    /// feeding `Task::parents`. Goes through the store rather than the
    /// in-memory graph so a task resumed after a crash sees authoritative
    /// state.
    async fn parent_rows(&self, node: NodeId) -> Result<Vec<NodeRow>, StoreError>;

    /// Finds the node of a given type within a data centre (or, if
    /// `data_centre` is `None`, within the cluster root scope). Some task
    /// kinds — `CreateInstance` chiefly — consume payload published by a
    /// node that is not a direct graph predecessor (the canonical topology
    /// only wires `CreateInstance` to `CreateEBS`, not to `SubNets` or
    /// `SecurityGroups`), so lookup is scoped by data centre and type
    /// rather than by edge.
    async fn find_node_in_data_centre(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        task_type: TaskType,
    ) -> Result<Option<NodeRow>, StoreError>;
}
