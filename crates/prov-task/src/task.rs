use prov_domain::{Action, ClusterId, DataCentreId, NodeId, Payload, TaskState, TaskType};
use prov_provider::Provider;
use prov_store::{NodeRow, Store};
use serde_json::json;
use tracing::debug;

use crate::error::{TaskError, TaskExecutionError};

/// Fixed addressing per §4.1's provision table. The original never makes
/// these configurable; this implementation doesn't either.
const VPC_CIDR: &str = "192.168.0.0/16";
const SUBNET_CIDR: &str = "192.168.1.0/24";
const DEFAULT_ROUTE: &str = "0.0.0.0/0";
const DEFAULT_IMAGE: &str = "ami-00000000000000000";
const DEFAULT_INSTANCE_TYPE: &str = "t3.micro";

/// A persistent node with a state machine and polymorphic provision/delete
/// behaviour keyed on `task_type`. `id` is `None` until `persist` assigns
/// one — attempting to act on an unpersisted task, or to persist the same
/// `Task` twice, is an `Invariant` error.
#[derive(Debug, Clone)]
pub struct Task {
    id: Option<NodeId>,
    task_type: TaskType,
    cluster: ClusterId,
    data_centre: Option<DataCentreId>,
}

impl Task {
    pub fn new(task_type: TaskType, cluster: ClusterId, data_centre: Option<DataCentreId>) -> Self {
        Self {
            id: None,
            task_type,
            cluster,
            data_centre,
        }
    }

    pub fn from_row(row: &NodeRow) -> Self {
        Self {
            id: Some(row.id),
            task_type: row.task_type,
            cluster: row.cluster,
            data_centre: row.data_centre,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn cluster(&self) -> ClusterId {
        self.cluster
    }

    /// Panics if called before `persist` — every call site in this
    /// workspace either constructs a `Task` from a store row (already
    /// persisted) or persists immediately after `new`.
    pub fn id(&self) -> NodeId {
        self.id.expect("task used before persist")
    }

    /// Inserts a `PENDING_PROVISION` row with an empty payload and assigns
    /// this `Task` its identifier. Calling `persist` a second time on the
    /// same `Task` is an invariant violation (scenario 6, §8).
    pub async fn persist(&mut self, store: &dyn Store) -> Result<NodeId, TaskError> {
        if self.id.is_some() {
            return Err(TaskError::Invariant(format!(
                "task {:?} already persisted as {}",
                self.task_type,
                self.id.unwrap()
            )));
        }
        let id = store
            .insert_node(self.cluster, self.data_centre, self.task_type, TaskState::PendingProvision)
            .await?;
        self.id = Some(id);
        Ok(id)
    }

    fn wrap(&self, e: impl Into<TaskError>) -> TaskExecutionError {
        TaskExecutionError::new(self.id(), self.task_type, e)
    }

    pub async fn set_state(&self, store: &dyn Store, state: TaskState) -> Result<(), TaskExecutionError> {
        store.set_state(self.id(), state).await.map_err(|e| self.wrap(e))
    }

    pub async fn set_payload(&self, store: &dyn Store, payload: Payload) -> Result<(), TaskExecutionError> {
        store.set_payload(self.id(), payload).await.map_err(|e| self.wrap(e))
    }

    /// `(type, state, payload)` triples for this task's direct predecessors,
    /// read through the store so a resumed task sees authoritative state.
    pub async fn parents(&self, store: &dyn Store) -> Result<Vec<(TaskType, TaskState, Payload)>, TaskExecutionError> {
        let rows = store.parent_rows(self.id()).await.map_err(|e| self.wrap(e))?;
        Ok(rows.into_iter().map(|r| (r.task_type, r.state, r.payload)).collect())
    }

    async fn sibling_payload(&self, store: &dyn Store, task_type: TaskType) -> Result<Payload, TaskExecutionError> {
        store
            .find_node_in_data_centre(self.cluster, self.data_centre, task_type)
            .await
            .map_err(|e| self.wrap(e))?
            .map(|row| row.payload)
            .ok_or_else(|| {
                self.wrap(TaskError::Configuration(format!(
                    "no {task_type} node found in data centre for {:?}",
                    self.task_type
                )))
            })
    }

    fn require_key<'a>(&self, payload: &'a Payload, key: &str) -> Result<&'a str, TaskExecutionError> {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.wrap(TaskError::Configuration(format!("missing parent payload key {key:?}"))))
    }

    /// Executes `action`'s behaviour for this task's concrete type. Returns
    /// the terminal state and emitted payload on success. Does not persist
    /// the result — §9's redesign note makes the dispatcher the sole
    /// writer of task state, so the caller persists both the in-flight
    /// transition (before calling `run`) and this return value (after).
    pub async fn run(
        &self,
        action: Action,
        store: &dyn Store,
        provider: &dyn Provider,
    ) -> Result<(TaskState, Payload), TaskExecutionError> {
        debug!(task_id = %self.id(), task_type = %self.task_type, ?action, "running task");
        let payload = match action {
            Action::Provision => self.provision(store, provider).await,
            Action::Delete => self.delete(store, provider).await,
        }?;
        Ok((action.terminal_state(), payload))
    }

    async fn provision(&self, store: &dyn Store, provider: &dyn Provider) -> Result<Payload, TaskExecutionError> {
        if self.task_type.is_structural() {
            return Ok(json!({}));
        }
        match self.task_type {
            TaskType::Vpc => {
                let vpc_id = provider.create_vpc(VPC_CIDR).await.map_err(|e| self.wrap(e))?;
                provider
                    .tag_resource(&vpc_id, "Name", "cluster-vpc")
                    .await
                    .map_err(|e| self.wrap(e))?;
                provider.wait_until_available(&vpc_id).await.map_err(|e| self.wrap(e))?;
                Ok(json!({ "vpc_id": vpc_id }))
            }
            TaskType::InternetGateway => {
                let parent = self.find_parent_payload(store, TaskType::Vpc).await?;
                let vpc_id = self.require_key(&parent, "vpc_id")?.to_string();
                let gateway_id = provider
                    .attach_internet_gateway(&vpc_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                Ok(json!({ "vpc_id": vpc_id, "gateway_id": gateway_id }))
            }
            TaskType::RouteTable => {
                let parent = self.find_parent_payload(store, TaskType::InternetGateway).await?;
                let vpc_id = self.require_key(&parent, "vpc_id")?.to_string();
                let gateway_id = self.require_key(&parent, "gateway_id")?.to_string();
                let route_table_id = provider.create_route_table(&vpc_id).await.map_err(|e| self.wrap(e))?;
                provider
                    .create_route(&route_table_id, DEFAULT_ROUTE, &gateway_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                Ok(json!({ "vpc_id": vpc_id, "gateway_id": gateway_id, "route_table_id": route_table_id }))
            }
            TaskType::SubNets => {
                let parent = self.find_parent_payload(store, TaskType::RouteTable).await?;
                let vpc_id = self.require_key(&parent, "vpc_id")?.to_string();
                let route_table_id = self.require_key(&parent, "route_table_id")?.to_string();
                let subnet_id = provider
                    .create_subnet(SUBNET_CIDR, &vpc_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                provider
                    .associate_route_table_with_subnet(&route_table_id, &subnet_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                let mut payload = parent;
                payload["subnet_id"] = json!(subnet_id);
                Ok(payload)
            }
            TaskType::SecurityGroups => {
                let parent = self.find_parent_payload(store, TaskType::Vpc).await?;
                let vpc_id = self.require_key(&parent, "vpc_id")?.to_string();
                let sg_id = provider
                    .create_security_group("cluster-sg", "cluster security group", &vpc_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                provider
                    .authorize_ingress(&sg_id, "icmp", "0.0.0.0/0")
                    .await
                    .map_err(|e| self.wrap(e))?;
                Ok(json!({ "security_group_id": sg_id }))
            }
            TaskType::CreateInstance => {
                let subnet_payload = self.sibling_payload(store, TaskType::SubNets).await?;
                let subnet_id = self.require_key(&subnet_payload, "subnet_id")?.to_string();
                let sg_payload = self.sibling_payload(store, TaskType::SecurityGroups).await?;
                let security_group_id = self.require_key(&sg_payload, "security_group_id")?.to_string();
                let instance_id = provider
                    .create_instances(DEFAULT_IMAGE, DEFAULT_INSTANCE_TYPE, &subnet_id, &security_group_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                provider
                    .wait_until_running(&instance_id)
                    .await
                    .map_err(|e| self.wrap(e))?;
                Ok(json!({ "instance_id": instance_id }))
            }
            _ => unreachable!("structural types handled above"),
        }
    }

    /// Looks up a single direct parent of the given type and returns its
    /// payload. `ConfigurationError` if no parent of that type exists —
    /// this would indicate the graph was built with a type tag missing an
    /// edge the builder's canonical topology always provides.
    async fn find_parent_payload(&self, store: &dyn Store, task_type: TaskType) -> Result<Payload, TaskExecutionError> {
        let parents = self.parents(store).await?;
        parents
            .into_iter()
            .find(|(t, ..)| *t == task_type)
            .map(|(_, _, payload)| payload)
            .ok_or_else(|| self.wrap(TaskError::Configuration(format!("no {task_type} parent found"))))
    }

    async fn delete(&self, _store: &dyn Store, _provider: &dyn Provider) -> Result<Payload, TaskExecutionError> {
        // Every concrete type in the closed set tears down with the same
        // shape: release whatever the provider handed back at provision
        // time, or do nothing for structural types. Since no type issues a
        // distinct provider delete call in §4.1's table, deletion is a
        // structural no-op across the board; the provider's own resources
        // are reclaimed by a higher-level teardown outside this engine's
        // scope (see §1, "the specific cloud-provider API calls... out of
        // scope").
        Ok(json!({}))
    }

    /// True iff `PENDING_PROVISION` and every predecessor is `PROVISIONED`.
    pub fn can_provision(state: TaskState, predecessor_states: &[TaskState]) -> bool {
        state == TaskState::PendingProvision
            && predecessor_states.iter().all(|s| *s == TaskState::Provisioned)
    }

    /// True iff `PENDING_DELETION` and every successor is `DELETED`.
    pub fn can_delete(state: TaskState, successor_states: &[TaskState]) -> bool {
        state == TaskState::PendingDeletion && successor_states.iter().all(|s| *s == TaskState::Deleted)
    }

    /// Resets a `FAILED` task back to the right `PENDING_*` state for the
    /// phase it failed under. Only valid when currently `FAILED`.
    pub fn retry_target(current: TaskState, phase: Action) -> Result<TaskState, TaskError> {
        if current != TaskState::Failed {
            return Err(TaskError::Invariant(format!(
                "retry_failed called on a task in state {current}, not FAILED"
            )));
        }
        Ok(phase.pending_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_provider::LocalProvider;
    use prov_store::InMemoryStore;

    #[tokio::test]
    async fn persist_twice_is_an_invariant_violation() {
        let store = InMemoryStore::new();
        let cluster = store.insert_cluster("t1").await.unwrap();
        let mut task = Task::new(TaskType::Cluster, cluster, None);
        task.persist(&store).await.unwrap();
        let err = task.persist(&store).await.unwrap_err();
        assert!(matches!(err, TaskError::Invariant(_)));
    }

    #[tokio::test]
    async fn structural_task_provisions_to_a_terminal_state_with_no_provider_call() {
        let store = InMemoryStore::new();
        let provider = LocalProvider::new();
        let cluster = store.insert_cluster("t1").await.unwrap();
        let mut task = Task::new(TaskType::DataCentre, cluster, None);
        task.persist(&store).await.unwrap();
        store.set_state(task.id(), TaskState::Provisioning).await.unwrap();

        let (state, payload) = task.run(Action::Provision, &store, &provider).await.unwrap();
        assert_eq!(state, TaskState::Provisioned);
        assert_eq!(payload, json!({}));
    }

    #[tokio::test]
    async fn vpc_provisions_and_emits_vpc_id() {
        let store = InMemoryStore::new();
        let provider = LocalProvider::new();
        let cluster = store.insert_cluster("t1").await.unwrap();
        let mut task = Task::new(TaskType::Vpc, cluster, None);
        task.persist(&store).await.unwrap();

        let (state, payload) = task.run(Action::Provision, &store, &provider).await.unwrap();
        assert_eq!(state, TaskState::Provisioned);
        assert!(payload["vpc_id"].as_str().unwrap().starts_with("local-vpc-"));
    }

    #[tokio::test]
    async fn internet_gateway_requires_a_vpc_parent() {
        let store = InMemoryStore::new();
        let provider = LocalProvider::new();
        let cluster = store.insert_cluster("t1").await.unwrap();
        let mut gw = Task::new(TaskType::InternetGateway, cluster, None);
        gw.persist(&store).await.unwrap();

        let err = gw.run(Action::Provision, &store, &provider).await.unwrap_err();
        assert!(matches!(err.source, TaskError::Configuration(_)));
    }

    #[tokio::test]
    async fn internet_gateway_consumes_vpc_parent_payload() {
        let store = InMemoryStore::new();
        let provider = LocalProvider::new();
        let cluster = store.insert_cluster("t1").await.unwrap();

        let mut vpc = Task::new(TaskType::Vpc, cluster, None);
        vpc.persist(&store).await.unwrap();
        let (_, vpc_payload) = vpc.run(Action::Provision, &store, &provider).await.unwrap();
        store.set_payload(vpc.id(), vpc_payload).await.unwrap();
        store.set_state(vpc.id(), TaskState::Provisioned).await.unwrap();

        let mut gw = Task::new(TaskType::InternetGateway, cluster, None);
        gw.persist(&store).await.unwrap();
        store.insert_edge(cluster, None, vpc.id(), gw.id()).await.unwrap();

        let (state, payload) = gw.run(Action::Provision, &store, &provider).await.unwrap();
        assert_eq!(state, TaskState::Provisioned);
        assert!(payload["vpc_id"].is_string());
        assert!(payload["gateway_id"].as_str().unwrap().starts_with("local-igw-"));
    }

    #[test]
    fn can_provision_requires_all_predecessors_provisioned() {
        assert!(Task::can_provision(TaskState::PendingProvision, &[]));
        assert!(Task::can_provision(
            TaskState::PendingProvision,
            &[TaskState::Provisioned, TaskState::Provisioned]
        ));
        assert!(!Task::can_provision(
            TaskState::PendingProvision,
            &[TaskState::Provisioned, TaskState::Provisioning]
        ));
        assert!(!Task::can_provision(TaskState::Provisioning, &[]));
    }

    #[test]
    fn can_delete_requires_all_successors_deleted() {
        assert!(Task::can_delete(TaskState::PendingDeletion, &[]));
        assert!(Task::can_delete(TaskState::PendingDeletion, &[TaskState::Deleted]));
        assert!(!Task::can_delete(TaskState::PendingDeletion, &[TaskState::PendingDeletion]));
    }

    #[test]
    fn retry_target_only_valid_from_failed() {
        assert_eq!(
            Task::retry_target(TaskState::Failed, Action::Provision).unwrap(),
            TaskState::PendingProvision
        );
        assert_eq!(
            Task::retry_target(TaskState::Failed, Action::Delete).unwrap(),
            TaskState::PendingDeletion
        );
        assert!(Task::retry_target(TaskState::Provisioned, Action::Provision).is_err());
    }
}
