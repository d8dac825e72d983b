//! Builds the canonical cluster topology and exposes a query layer over it
//! (components C3 and C4).

mod builder;
mod error;
mod execution_graph;

pub use builder::GraphBuilder;
pub use error::GraphError;
pub use execution_graph::ExecutionGraph;
