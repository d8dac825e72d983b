//! The bounded-concurrency event loop that drives a cluster's DAG to
//! completion for a given phase (component C5).

mod config;
mod error;
mod executor;

pub use config::ExecutorConfig;
pub use error::ExecutorError;
pub use executor::Executor;
