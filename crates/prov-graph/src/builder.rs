use prov_domain::{ClusterId, DataCentreId, NodeId, TaskState, TaskType};
use prov_store::Store;
use prov_task::Task;
use tracing::warn;

use crate::error::GraphError;
use crate::execution_graph::ExecutionGraph;

/// Builds and loads cluster DAGs. `create` materialises a fresh topology
/// into the store; `read` reconstructs one already there with no side
/// effects; `recover` additionally applies the crash-recovery rule from
/// §4.3 step 2 and must only be called once, at genuine executor startup.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Constructs a fresh cluster with `n_dcs` data centres, each with
    /// `n_nodes` compute instances, wired per the canonical topology in
    /// §4.3 step 4–6.
    ///
    /// The original builder this is modelled on returns from inside its
    /// per-data-centre loop, so only the first data centre's edges were
    /// ever persisted (§9: "treat as a bug... build all DCs, then
    /// return"). This implementation persists every data centre before
    /// returning.
    pub async fn create(
        store: &dyn Store,
        name: &str,
        n_nodes: usize,
        n_dcs: usize,
    ) -> Result<(ClusterId, ExecutionGraph), GraphError> {
        let cluster_id = store.insert_cluster(name).await?;

        let mut cluster_task = Task::new(TaskType::Cluster, cluster_id, None);
        let cluster_node = cluster_task.persist(store).await?;

        for _ in 0..n_dcs {
            Self::create_data_centre(store, cluster_id, n_nodes, cluster_node).await?;
        }

        Self::read(store, cluster_id).await
    }

    async fn persist_task(
        store: &dyn Store,
        cluster_id: ClusterId,
        dc_id: DataCentreId,
        task_type: TaskType,
    ) -> Result<NodeId, GraphError> {
        let mut task = Task::new(task_type, cluster_id, Some(dc_id));
        Ok(task.persist(store).await?)
    }

    async fn create_data_centre(
        store: &dyn Store,
        cluster_id: ClusterId,
        n_nodes: usize,
        cluster_node: NodeId,
    ) -> Result<(), GraphError> {
        let dc_id = store.insert_data_centre(cluster_id).await?;

        let data_centre = Self::persist_task(store, cluster_id, dc_id, TaskType::DataCentre).await?;
        let role = Self::persist_task(store, cluster_id, dc_id, TaskType::Role).await?;
        let vpc = Self::persist_task(store, cluster_id, dc_id, TaskType::Vpc).await?;
        let security_groups = Self::persist_task(store, cluster_id, dc_id, TaskType::SecurityGroups).await?;
        let internet_gateway = Self::persist_task(store, cluster_id, dc_id, TaskType::InternetGateway).await?;
        let route_table = Self::persist_task(store, cluster_id, dc_id, TaskType::RouteTable).await?;
        let subnets = Self::persist_task(store, cluster_id, dc_id, TaskType::SubNets).await?;
        let firewall_rules = Self::persist_task(store, cluster_id, dc_id, TaskType::FirewallRules).await?;

        let mut edges = vec![
            (cluster_node, data_centre),
            (data_centre, role),
            (data_centre, vpc),
            (vpc, security_groups),
            (vpc, internet_gateway),
            (vpc, route_table),
            (vpc, subnets),
            (internet_gateway, route_table),
            (route_table, subnets),
            (security_groups, firewall_rules),
        ];

        for _ in 0..n_nodes {
            let create_instance = Self::persist_task(store, cluster_id, dc_id, TaskType::CreateInstance).await?;
            let create_ebs = Self::persist_task(store, cluster_id, dc_id, TaskType::CreateEbs).await?;
            let attach_ebs = Self::persist_task(store, cluster_id, dc_id, TaskType::AttachEbs).await?;
            let bind_security_group =
                Self::persist_task(store, cluster_id, dc_id, TaskType::BindSecurityGroup).await?;
            let bind_ip = Self::persist_task(store, cluster_id, dc_id, TaskType::BindIp).await?;

            edges.push((data_centre, create_ebs));
            edges.push((create_ebs, create_instance));
            edges.push((create_instance, attach_ebs));
            edges.push((create_instance, bind_ip));
            edges.push((create_instance, bind_security_group));
            edges.push((security_groups, bind_security_group));
        }

        for (from_node, to_node) in edges {
            store.insert_edge(cluster_id, Some(dc_id), from_node, to_node).await?;
        }

        Ok(())
    }

    /// Reconstructs the in-memory DAG from the store exactly as persisted,
    /// with no side effects. Safe to call at any time — a status poll, a
    /// graph dump — including against a cluster some other process is
    /// actively driving.
    pub async fn read(store: &dyn Store, cluster_id: ClusterId) -> Result<(ClusterId, ExecutionGraph), GraphError> {
        let nodes = store.list_nodes(cluster_id).await?;
        if nodes.is_empty() {
            return Err(GraphError::EmptyCluster(cluster_id.to_string()));
        }

        let edges = store.list_edges(cluster_id).await?;
        let graph = ExecutionGraph::from_rows(cluster_id, nodes, edges)?;
        Ok((cluster_id, graph))
    }

    /// Reconstructs the in-memory DAG from the store, additionally applying
    /// the crash-recovery rule from §4.3 step 2: any node found
    /// `PROVISIONING` or `DELETING` is assumed to be the victim of a crash
    /// and is forcibly transitioned to `FAILED` before the graph can be
    /// scheduled against. Only valid at genuine process restart — calling
    /// this against a cluster another process is legitimately driving would
    /// fail every task currently in flight out from under it. `Executor::run`
    /// is this workspace's only caller.
    pub async fn recover(store: &dyn Store, cluster_id: ClusterId) -> Result<(ClusterId, ExecutionGraph), GraphError> {
        let mut nodes = store.list_nodes(cluster_id).await?;
        if nodes.is_empty() {
            return Err(GraphError::EmptyCluster(cluster_id.to_string()));
        }

        for node in &mut nodes {
            if node.state.is_in_flight() {
                warn!(node_id = %node.id, state = %node.state, "node was in-flight on load, marking FAILED");
                store.set_state(node.id, TaskState::Failed).await?;
                node.state = TaskState::Failed;
            }
        }

        let edges = store.list_edges(cluster_id).await?;
        let graph = ExecutionGraph::from_rows(cluster_id, nodes, edges)?;
        Ok((cluster_id, graph))
    }
}
