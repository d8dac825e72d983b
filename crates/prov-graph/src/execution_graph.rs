use std::collections::HashMap;

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use prov_domain::{Action, ClusterId, NodeId, TaskState, TaskType};
use prov_store::{EdgeRow, NodeRow};

use crate::error::GraphError;

/// A lightweight in-memory handle for a node: an id, a type tag, and a
/// cached state. Per §9's redesign note, this cache is refreshed by
/// `update_state` whenever the dispatcher (the sole writer) persists a
/// transition — the graph itself never writes to the store.
#[derive(Debug, Clone, Copy)]
struct TaskHandle {
    task_type: TaskType,
    state: TaskState,
}

/// The in-memory DAG plus a thin query layer over it (component C4).
pub struct ExecutionGraph {
    cluster: ClusterId,
    graph: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
    handles: HashMap<NodeId, TaskHandle>,
    root: NodeId,
}

impl ExecutionGraph {
    pub(crate) fn from_rows(
        cluster: ClusterId,
        nodes: Vec<NodeRow>,
        edges: Vec<EdgeRow>,
    ) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::EmptyCluster(cluster.to_string()));
        }

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut handles = HashMap::new();
        for row in &nodes {
            let idx = graph.add_node(row.id);
            index.insert(row.id, idx);
            handles.insert(
                row.id,
                TaskHandle {
                    task_type: row.task_type,
                    state: row.state,
                },
            );
        }
        for edge in &edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from_node), index.get(&edge.to_node)) {
                graph.add_edge(from, to, ());
            }
        }

        if is_cyclic_directed(&graph) {
            return Err(GraphError::CycleDetected);
        }

        let order = toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;
        let root = graph[*order.first().expect("non-empty graph has a topological order")];

        Ok(Self {
            cluster,
            graph,
            index,
            handles,
            root,
        })
    }

    pub fn cluster(&self) -> ClusterId {
        self.cluster
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn task_type(&self, node: NodeId) -> Option<TaskType> {
        self.handles.get(&node).map(|h| h.task_type)
    }

    pub fn state(&self, node: NodeId) -> Option<TaskState> {
        self.handles.get(&node).map(|h| h.state)
    }

    /// Called by the dispatcher after it persists a transition, so the
    /// in-memory cache never drifts from the store for longer than one
    /// tick.
    pub fn update_state(&mut self, node: NodeId, state: TaskState) {
        if let Some(handle) = self.handles.get_mut(&node) {
            handle.state = state;
        }
    }

    fn predecessor_states(&self, node: NodeId) -> Vec<TaskState> {
        let idx = self.index[&node];
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|i| self.handles[&self.graph[i]].state)
            .collect()
    }

    fn successor_states(&self, node: NodeId) -> Vec<TaskState> {
        let idx = self.index[&node];
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|i| self.handles[&self.graph[i]].state)
            .collect()
    }

    /// Tasks with `can_provision == true`, i.e. `PENDING_PROVISION` with
    /// every predecessor `PROVISIONED`.
    pub fn runnable_provision_tasks(&self) -> Vec<NodeId> {
        self.handles
            .keys()
            .filter(|&&id| {
                let handle = self.handles[&id];
                prov_task::Task::can_provision(handle.state, &self.predecessor_states(id))
            })
            .copied()
            .collect()
    }

    /// Tasks with `can_delete == true`, i.e. `PENDING_DELETION` with every
    /// successor `DELETED`.
    pub fn runnable_delete_tasks(&self) -> Vec<NodeId> {
        self.handles
            .keys()
            .filter(|&&id| {
                let handle = self.handles[&id];
                prov_task::Task::can_delete(handle.state, &self.successor_states(id))
            })
            .copied()
            .collect()
    }

    pub fn nodes_in_state(&self, state: TaskState) -> Vec<NodeId> {
        self.handles
            .iter()
            .filter(|(_, h)| h.state == state)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn percent_complete(&self, phase: Action) -> f64 {
        if self.handles.is_empty() {
            return 100.0;
        }
        let done = self.nodes_in_state(phase.terminal_state()).len();
        (done as f64) * 100.0 / (self.handles.len() as f64)
    }

    pub fn complete(&self, phase: Action) -> bool {
        let terminal = phase.terminal_state();
        self.handles.values().all(|h| h.state == terminal)
    }

    pub fn info(&self, phase: Action) -> String {
        let pending = self.nodes_in_state(phase.pending_state()).len();
        let failed = self.nodes_in_state(TaskState::Failed).len();
        let complete = self.nodes_in_state(phase.terminal_state()).len();
        let executing = self.nodes_in_state(phase.in_flight_state()).len();
        format!(
            "{:.2}% done: Pending: {pending}, Failed: {failed}, Complete: {complete}, Executing: {executing}",
            self.percent_complete(phase)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_domain::{DataCentreId, NodeId as Id};

    fn row(id: Id, t: TaskType, state: TaskState) -> NodeRow {
        NodeRow {
            id,
            task_type: t,
            cluster: ClusterId::new(),
            data_centre: None::<DataCentreId>,
            state,
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn cluster_root_with_no_predecessors_is_runnable() {
        let cluster = ClusterId::new();
        let root = Id::new();
        let nodes = vec![row(root, TaskType::Cluster, TaskState::PendingProvision)];
        let graph = ExecutionGraph::from_rows(cluster, nodes, vec![]).unwrap();
        assert_eq!(graph.runnable_provision_tasks(), vec![root]);
    }

    #[test]
    fn child_is_not_runnable_until_parent_is_provisioned() {
        let cluster = ClusterId::new();
        let parent = Id::new();
        let child = Id::new();
        let nodes = vec![
            row(parent, TaskType::Cluster, TaskState::PendingProvision),
            row(child, TaskType::DataCentre, TaskState::PendingProvision),
        ];
        let edges = vec![EdgeRow { from_node: parent, to_node: child }];
        let graph = ExecutionGraph::from_rows(cluster, nodes, edges).unwrap();
        let runnable = graph.runnable_provision_tasks();
        assert!(runnable.contains(&parent));
        assert!(!runnable.contains(&child));
    }

    #[test]
    fn percent_complete_counts_provisioned_nodes() {
        let cluster = ClusterId::new();
        let a = Id::new();
        let b = Id::new();
        let nodes = vec![
            row(a, TaskType::Cluster, TaskState::Provisioned),
            row(b, TaskType::DataCentre, TaskState::PendingProvision),
        ];
        let graph = ExecutionGraph::from_rows(cluster, nodes, vec![]).unwrap();
        assert_eq!(graph.percent_complete(Action::Provision), 50.0);
        assert!(!graph.complete(Action::Provision));
    }

    #[test]
    fn update_state_refreshes_the_cache_used_by_runnable_queries() {
        let cluster = ClusterId::new();
        let parent = Id::new();
        let child = Id::new();
        let nodes = vec![
            row(parent, TaskType::Cluster, TaskState::PendingProvision),
            row(child, TaskType::DataCentre, TaskState::PendingProvision),
        ];
        let edges = vec![EdgeRow { from_node: parent, to_node: child }];
        let mut graph = ExecutionGraph::from_rows(cluster, nodes, edges).unwrap();
        graph.update_state(parent, TaskState::Provisioned);
        assert!(graph.runnable_provision_tasks().contains(&child));
    }
}
