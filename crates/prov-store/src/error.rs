use thiserror::Error;

/// Relational-store failures. `InvariantViolation` is fatal wherever it
/// surfaces (see the executor and graph builder); everything else is a
/// plain I/O-shaped error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}
