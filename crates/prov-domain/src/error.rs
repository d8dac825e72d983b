use thiserror::Error;

/// Errors raised by pure domain logic — no I/O, no store, no provider.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown task type tag {0:?}")]
    UnknownTaskType(String),

    #[error("unknown task state {0:?}")]
    UnknownTaskState(String),
}
