use prov_store::StoreError;
use prov_task::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("cluster's edge set contains a cycle")]
    CycleDetected,

    #[error("cluster {0} has no persisted nodes")]
    EmptyCluster(String),
}
