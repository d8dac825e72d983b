use prov_domain::{NodeId, TaskType};
use prov_provider::ProviderError;
use prov_store::StoreError;
use thiserror::Error;

/// The four error kinds named in the error-handling design: a provider or
/// store failure during `run`, or one of the two fatal kinds raised by
/// `persist` / `parents` / load-time validation.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invariant violation: {0}")]
    Invariant(String),
}

/// A `TaskError` wrapped with the identity of the task that raised it.
/// `run` never lets a bare `TaskError` escape — everything is wrapped here
/// before it reaches the dispatcher, per §4.1's failure semantics.
#[derive(Debug, Error)]
#[error("task {task_id} ({task_type}): {source}")]
pub struct TaskExecutionError {
    pub task_id: NodeId,
    pub task_type: TaskType,
    #[source]
    pub source: TaskError,
}

impl TaskExecutionError {
    pub fn new(task_id: NodeId, task_type: TaskType, source: impl Into<TaskError>) -> Self {
        Self {
            task_id,
            task_type,
            source: source.into(),
        }
    }
}
