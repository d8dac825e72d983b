//! The external `Provider` collaborator: opaque create / attach / wait /
//! tag operations against a cloud API, consumed by `prov-task` for the
//! provider-effectful task kinds.

mod aws;
mod error;
mod local;
mod provider;

pub use aws::{AwsProvider, AwsProviderConfig};
pub use error::ProviderError;
pub use local::LocalProvider;
pub use provider::Provider;
