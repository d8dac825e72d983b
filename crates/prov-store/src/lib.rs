//! Durable persistence of nodes, edges, states, and payloads (component C2).
//!
//! The `Store` trait is the only thing the rest of the workspace depends on;
//! `PostgresStore` and `InMemoryStore` are interchangeable behind it.

mod error;
mod memory;
mod postgres_store;
mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres_store::PostgresStore;
pub use store::{EdgeRow, NodeRow, Store};
