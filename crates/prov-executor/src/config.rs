use std::time::Duration;

use prov_domain::Action;

/// Executor tuning knobs (§4.5).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum concurrent provider-bound tasks.
    pub pool_size: usize,
    /// Sleep between scheduling ticks.
    pub poll_interval: Duration,
    /// `PROVISION` or `DELETE` — selects which ready-set query is used and
    /// which terminal state `complete()` checks for.
    pub phase: Action,
}

impl ExecutorConfig {
    pub fn new(phase: Action) -> Self {
        Self {
            phase,
            ..Self::default_for(phase)
        }
    }

    fn default_for(phase: Action) -> Self {
        Self {
            pool_size: 100,
            poll_interval: Duration::from_secs(1),
            phase,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::default_for(Action::Provision)
    }
}
