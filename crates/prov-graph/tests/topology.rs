use prov_domain::{Action, TaskState, TaskType};
use prov_graph::GraphBuilder;
use prov_store::{InMemoryStore, Store};

#[tokio::test]
async fn create_builds_every_data_centre_not_just_the_first() {
    // Regression test for the bug noted in §9: the original builder
    // returned from inside its per-data-centre loop, so only the first
    // data centre's edges were ever persisted.
    let store = InMemoryStore::new();
    let (cluster_id, graph) = GraphBuilder::create(&store, "t2", 3, 2).await.unwrap();

    let nodes = store.list_nodes(cluster_id).await.unwrap();
    let dc_count = nodes.iter().filter(|n| n.task_type == TaskType::DataCentre).count();
    let vpc_count = nodes.iter().filter(|n| n.task_type == TaskType::Vpc).count();
    let instance_count = nodes.iter().filter(|n| n.task_type == TaskType::CreateInstance).count();

    assert_eq!(dc_count, 2);
    assert_eq!(vpc_count, 2);
    assert_eq!(instance_count, 6);
    assert_eq!(graph.len(), nodes.len());
}

#[tokio::test]
async fn n_dcs_zero_produces_a_single_node_cluster() {
    let store = InMemoryStore::new();
    let (cluster_id, graph) = GraphBuilder::create(&store, "solo", 0, 0).await.unwrap();
    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].task_type, TaskType::Cluster);
    assert!(!graph.complete(Action::Provision));
    assert_eq!(graph.runnable_provision_tasks(), vec![graph.root()]);
}

#[tokio::test]
async fn n_nodes_zero_produces_a_dc_skeleton_with_no_instance_tasks() {
    let store = InMemoryStore::new();
    let (cluster_id, _graph) = GraphBuilder::create(&store, "skeleton", 0, 1).await.unwrap();
    let nodes = store.list_nodes(cluster_id).await.unwrap();
    assert!(nodes.iter().all(|n| n.task_type != TaskType::CreateInstance));
    assert!(nodes.iter().any(|n| n.task_type == TaskType::Vpc));
}

#[tokio::test]
async fn create_then_read_preserves_node_and_edge_set() {
    let store = InMemoryStore::new();
    let (cluster_id, built) = GraphBuilder::create(&store, "roundtrip", 1, 1).await.unwrap();
    let (_, loaded) = GraphBuilder::read(&store, cluster_id).await.unwrap();
    assert_eq!(built.len(), loaded.len());
}

#[tokio::test]
async fn read_leaves_in_flight_nodes_untouched() {
    // `read` is the path a live status poll takes while a run is actually
    // in progress — it must never mutate a node it finds PROVISIONING.
    let store = InMemoryStore::new();
    let (cluster_id, _graph) = GraphBuilder::create(&store, "live", 1, 1).await.unwrap();
    let nodes = store.list_nodes(cluster_id).await.unwrap();
    let vpc = nodes.iter().find(|n| n.task_type == TaskType::Vpc).unwrap();
    store.set_state(vpc.id, TaskState::Provisioning).await.unwrap();

    let (_, read) = GraphBuilder::read(&store, cluster_id).await.unwrap();
    assert_eq!(read.state(vpc.id), Some(TaskState::Provisioning));

    let persisted = store.get_node(vpc.id).await.unwrap();
    assert_eq!(persisted.state, TaskState::Provisioning);
}

#[tokio::test]
async fn recover_fails_in_flight_nodes_to_recover_from_a_crash() {
    let store = InMemoryStore::new();
    let (cluster_id, _graph) = GraphBuilder::create(&store, "crash", 1, 1).await.unwrap();
    let nodes = store.list_nodes(cluster_id).await.unwrap();
    let vpc = nodes.iter().find(|n| n.task_type == TaskType::Vpc).unwrap();
    store.set_state(vpc.id, TaskState::Provisioning).await.unwrap();

    let (_, recovered) = GraphBuilder::recover(&store, cluster_id).await.unwrap();
    assert_eq!(recovered.state(vpc.id), Some(TaskState::Failed));

    let in_flight = recovered.nodes_in_state(TaskState::Provisioning).len()
        + recovered.nodes_in_state(TaskState::Deleting).len();
    assert_eq!(in_flight, 0);
}

#[tokio::test]
async fn runnable_provision_tasks_are_a_subset_of_pending_provision() {
    let store = InMemoryStore::new();
    let (_cluster_id, graph) = GraphBuilder::create(&store, "t1", 1, 1).await.unwrap();
    let pending: std::collections::HashSet<_> =
        graph.nodes_in_state(TaskState::PendingProvision).into_iter().collect();
    for id in graph.runnable_provision_tasks() {
        assert!(pending.contains(&id));
    }
}
