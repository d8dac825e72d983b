use serde::{Deserialize, Serialize};

/// One of `PROVISION` or `DELETE`. Selects which ready-set query the
/// execution graph runs and which terminal state `complete()` checks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Provision,
    Delete,
}

impl Action {
    pub fn terminal_state(self) -> TaskState {
        match self {
            Action::Provision => TaskState::Provisioned,
            Action::Delete => TaskState::Deleted,
        }
    }

    pub fn in_flight_state(self) -> TaskState {
        match self {
            Action::Provision => TaskState::Provisioning,
            Action::Delete => TaskState::Deleting,
        }
    }

    /// The `PENDING_*` state `retry_failed` re-arms a `FAILED` task into,
    /// when that task failed while running this action.
    pub fn pending_state(self) -> TaskState {
        match self {
            Action::Provision => TaskState::PendingProvision,
            Action::Delete => TaskState::PendingDeletion,
        }
    }
}

/// The closed set of states a node can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    PendingProvision,
    Provisioning,
    Provisioned,
    PendingDeletion,
    Deleting,
    Deleted,
    Failed,
}

impl TaskState {
    pub const ALL: [TaskState; 7] = [
        TaskState::PendingProvision,
        TaskState::Provisioning,
        TaskState::Provisioned,
        TaskState::PendingDeletion,
        TaskState::Deleting,
        TaskState::Deleted,
        TaskState::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::PendingProvision => "PENDING_PROVISION",
            TaskState::Provisioning => "PROVISIONING",
            TaskState::Provisioned => "PROVISIONED",
            TaskState::PendingDeletion => "PENDING_DELETION",
            TaskState::Deleting => "DELETING",
            TaskState::Deleted => "DELETED",
            TaskState::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<TaskState> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// True for states a crashed process could plausibly have left a node
    /// in mid-transition. Used by the crash-recovery rule on load.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskState::Provisioning | TaskState::Deleting)
    }

    pub fn is_terminal_for(self, action: Action) -> bool {
        self == action.terminal_state()
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
