//! Identifiers, task type tags, and the task state machine.
//!
//! This crate carries no I/O. It is shared by every other crate in the
//! workspace as the vocabulary both the store and the task dispatcher agree
//! on.

mod error;
mod ids;
mod state;
mod task_type;

pub use error::DomainError;
pub use ids::{ClusterId, DataCentreId, NodeId};
pub use state::{Action, TaskState};
pub use task_type::TaskType;

/// JSON payload carried on a node. The wire form is always an object; an
/// absent key is a valid (if incomplete) payload.
pub type Payload = serde_json::Value;

/// An empty JSON object, the payload a freshly persisted task starts with.
pub fn empty_payload() -> Payload {
    serde_json::json!({})
}
