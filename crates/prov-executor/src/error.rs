use prov_graph::GraphError;
use prov_store::StoreError;
use thiserror::Error;

/// Errors that can abort the executor's event loop. Per-task failures
/// never reach here — §7's propagation policy catches those inside `run`
/// and converts them to `FAILED` + a logged `TaskExecutionError`. Only a
/// store failure during retry/state-marking, or a graph load failure, is
/// fatal to the loop itself.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
