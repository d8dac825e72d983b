use std::sync::Arc;

use prov_domain::{ClusterId, NodeId, TaskState};
use prov_graph::{ExecutionGraph, GraphBuilder};
use prov_provider::Provider;
use prov_store::Store;
use prov_task::Task;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::config::ExecutorConfig;
use crate::error::ExecutorError;

/// The top-level event loop (component C5): polls the execution graph for
/// the runnable set, dispatches each task to a bounded worker pool, drains
/// completions, retries failures, and terminates when the graph reaches
/// the phase's terminal state everywhere.
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Runs `cluster_id` to completion for the configured phase. Loads the
    /// graph via `GraphBuilder::recover`, applying the crash-recovery sweep
    /// exactly once at this startup, then loops until `graph.complete(phase)`.
    pub async fn run(
        &self,
        store: Arc<dyn Store>,
        provider: Arc<dyn Provider>,
        cluster_id: ClusterId,
    ) -> Result<(), ExecutorError> {
        let (_, mut graph) = GraphBuilder::recover(store.as_ref(), cluster_id).await?;
        self.drive(store, provider, &mut graph).await
    }

    /// Runs an already-loaded graph to completion. Split out from `run` so
    /// callers (tests, the API's long-running handler) can hold onto the
    /// graph across calls instead of reloading it from the store.
    pub async fn drive(
        &self,
        store: Arc<dyn Store>,
        provider: Arc<dyn Provider>,
        graph: &mut ExecutionGraph,
    ) -> Result<(), ExecutorError> {
        let phase = self.config.phase;

        loop {
            let runnable = match phase {
                prov_domain::Action::Provision => graph.runnable_provision_tasks(),
                prov_domain::Action::Delete => graph.runnable_delete_tasks(),
            };

            let semaphore = Arc::new(Semaphore::new(self.config.pool_size.max(1)));
            let (tx, mut rx) = mpsc::channel(runnable.len().max(1));

            for node_id in runnable {
                let task_type = graph
                    .task_type(node_id)
                    .expect("runnable node always has a cached handle");

                store.set_state(node_id, phase.in_flight_state()).await?;
                graph.update_state(node_id, phase.in_flight_state());

                let store = store.clone();
                let provider = provider.clone();
                let tx = tx.clone();
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed while tasks are in flight");

                tokio::spawn(async move {
                    let _permit = permit;
                    let result = run_one(node_id, task_type, phase, store.as_ref(), provider.as_ref()).await;
                    let _ = tx.send((node_id, result)).await;
                });
            }
            drop(tx);

            while let Some((node_id, result)) = rx.recv().await {
                match result {
                    Ok((state, payload)) => {
                        store.set_payload(node_id, payload).await?;
                        store.set_state(node_id, state).await?;
                        graph.update_state(node_id, state);
                    }
                    Err(error) => {
                        warn!(%error, "task execution failed");
                        store.set_state(node_id, TaskState::Failed).await?;
                        graph.update_state(node_id, TaskState::Failed);
                    }
                }
            }

            self.retry_failed(store.as_ref(), graph, phase).await?;

            info!("{}", graph.info(phase));

            if graph.complete(phase) {
                break;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        Ok(())
    }

    /// Re-arms every `FAILED` task to the appropriate `PENDING_*` state for
    /// next tick. Unbounded, no backoff — see §4.5 and the open question in
    /// §9 about whether that's the right call for real providers.
    async fn retry_failed(
        &self,
        store: &dyn Store,
        graph: &mut ExecutionGraph,
        phase: prov_domain::Action,
    ) -> Result<(), ExecutorError> {
        for node_id in graph.nodes_in_state(TaskState::Failed) {
            let current = graph.state(node_id).expect("failed node has a cached handle");
            if let Ok(target) = Task::retry_target(current, phase) {
                store.set_state(node_id, target).await?;
                graph.update_state(node_id, target);
            }
        }
        Ok(())
    }
}

async fn run_one(
    node_id: NodeId,
    task_type: prov_domain::TaskType,
    phase: prov_domain::Action,
    store: &dyn Store,
    provider: &dyn Provider,
) -> Result<(TaskState, prov_domain::Payload), prov_task::TaskExecutionError> {
    let row = store
        .get_node(node_id)
        .await
        .map_err(|e| prov_task::TaskExecutionError::new(node_id, task_type, e))?;
    let task = Task::from_row(&row);
    task.run(phase, store, provider).await
}
