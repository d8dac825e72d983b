mod client;
mod sigv4;
mod xml;

pub use client::{AwsProvider, AwsProviderConfig};
