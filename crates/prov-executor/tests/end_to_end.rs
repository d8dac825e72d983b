use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prov_domain::{Action, TaskState, TaskType};
use prov_executor::{Executor, ExecutorConfig};
use prov_graph::GraphBuilder;
use prov_provider::{LocalProvider, Provider, ProviderError};
use prov_store::{InMemoryStore, Store};

fn fast_config(phase: Action) -> ExecutorConfig {
    ExecutorConfig {
        pool_size: 16,
        poll_interval: Duration::from_millis(5),
        phase,
    }
}

#[tokio::test]
async fn a_single_node_single_dc_cluster_fully_provisions() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let provider: Arc<dyn Provider> = Arc::new(LocalProvider::new());
    let (cluster_id, _graph) = GraphBuilder::create(store.as_ref(), "t1", 1, 1).await.unwrap();

    let executor = Executor::new(fast_config(Action::Provision));
    executor.run(store.clone(), provider, cluster_id).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert!(nodes.iter().all(|n| n.state == TaskState::Provisioned));
    assert_eq!(nodes.iter().filter(|n| n.task_type == TaskType::Vpc).count(), 1);
    assert_eq!(
        nodes.iter().filter(|n| n.task_type == TaskType::InternetGateway).count(),
        1
    );
    assert_eq!(
        nodes.iter().filter(|n| n.task_type == TaskType::CreateInstance).count(),
        1
    );
}

#[tokio::test]
async fn two_data_centres_three_nodes_each_all_provision() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let provider: Arc<dyn Provider> = Arc::new(LocalProvider::new());
    let (cluster_id, _graph) = GraphBuilder::create(store.as_ref(), "t2", 3, 2).await.unwrap();

    let executor = Executor::new(fast_config(Action::Provision));
    executor.run(store.clone(), provider, cluster_id).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert!(nodes.iter().all(|n| n.state == TaskState::Provisioned));
    assert_eq!(nodes.iter().filter(|n| n.task_type == TaskType::DataCentre).count(), 2);
    assert_eq!(
        nodes.iter().filter(|n| n.task_type == TaskType::CreateInstance).count(),
        6
    );
}

/// A provider that fails `create_vpc` exactly once, then delegates to a
/// real `LocalProvider` for every subsequent call — including the retry.
struct FlakyOnFirstVpc {
    inner: LocalProvider,
    vpc_attempts: AtomicUsize,
}

#[async_trait]
impl Provider for FlakyOnFirstVpc {
    async fn create_vpc(&self, cidr: &str) -> Result<String, ProviderError> {
        if self.vpc_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ProviderError::CallFailed("simulated transient failure".into()));
        }
        self.inner.create_vpc(cidr).await
    }
    async fn attach_internet_gateway(&self, vpc_id: &str) -> Result<String, ProviderError> {
        self.inner.attach_internet_gateway(vpc_id).await
    }
    async fn create_route_table(&self, vpc_id: &str) -> Result<String, ProviderError> {
        self.inner.create_route_table(vpc_id).await
    }
    async fn create_route(&self, rt: &str, cidr: &str, gw: &str) -> Result<(), ProviderError> {
        self.inner.create_route(rt, cidr, gw).await
    }
    async fn create_subnet(&self, cidr: &str, vpc_id: &str) -> Result<String, ProviderError> {
        self.inner.create_subnet(cidr, vpc_id).await
    }
    async fn associate_route_table_with_subnet(&self, rt: &str, subnet: &str) -> Result<(), ProviderError> {
        self.inner.associate_route_table_with_subnet(rt, subnet).await
    }
    async fn create_security_group(&self, name: &str, desc: &str, vpc_id: &str) -> Result<String, ProviderError> {
        self.inner.create_security_group(name, desc, vpc_id).await
    }
    async fn authorize_ingress(&self, sg: &str, proto: &str, cidr: &str) -> Result<(), ProviderError> {
        self.inner.authorize_ingress(sg, proto, cidr).await
    }
    async fn create_instances(&self, image: &str, ty: &str, subnet: &str, sg: &str) -> Result<String, ProviderError> {
        self.inner.create_instances(image, ty, subnet, sg).await
    }
    async fn wait_until_running(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.inner.wait_until_running(instance_id).await
    }
    async fn wait_until_available(&self, vpc_id: &str) -> Result<(), ProviderError> {
        self.inner.wait_until_available(vpc_id).await
    }
    async fn tag_resource(&self, id: &str, k: &str, v: &str) -> Result<(), ProviderError> {
        self.inner.tag_resource(id, k, v).await
    }
}

#[tokio::test]
async fn a_task_that_fails_once_is_retried_until_it_succeeds() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let provider: Arc<dyn Provider> = Arc::new(FlakyOnFirstVpc {
        inner: LocalProvider::new(),
        vpc_attempts: AtomicUsize::new(0),
    });
    let (cluster_id, _graph) = GraphBuilder::create(store.as_ref(), "flaky", 1, 1).await.unwrap();

    let executor = Executor::new(fast_config(Action::Provision));
    executor.run(store.clone(), provider, cluster_id).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert!(nodes.iter().all(|n| n.state == TaskState::Provisioned));
}

#[tokio::test]
async fn deleting_a_fully_provisioned_cluster_reaches_all_deleted() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let provider: Arc<dyn Provider> = Arc::new(LocalProvider::new());
    let (cluster_id, _graph) = GraphBuilder::create(store.as_ref(), "teardown", 1, 1).await.unwrap();

    let provision = Executor::new(fast_config(Action::Provision));
    provision.run(store.clone(), provider.clone(), cluster_id).await.unwrap();

    for node in store.list_nodes(cluster_id).await.unwrap() {
        store.set_state(node.id, TaskState::PendingDeletion).await.unwrap();
    }

    let delete = Executor::new(fast_config(Action::Delete));
    delete.run(store.clone(), provider, cluster_id).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert!(nodes.iter().all(|n| n.state == TaskState::Deleted));
}

#[tokio::test]
async fn a_crashed_in_flight_node_is_recovered_and_the_run_completes() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let provider: Arc<dyn Provider> = Arc::new(LocalProvider::new());
    let (cluster_id, _graph) = GraphBuilder::create(store.as_ref(), "crash", 1, 1).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    let vpc = nodes.iter().find(|n| n.task_type == TaskType::Vpc).unwrap();
    store.set_state(vpc.id, TaskState::Provisioning).await.unwrap();

    let executor = Executor::new(fast_config(Action::Provision));
    executor.run(store.clone(), provider, cluster_id).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert!(nodes.iter().all(|n| n.state == TaskState::Provisioned));
}
