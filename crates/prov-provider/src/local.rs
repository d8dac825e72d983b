use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::Provider;

/// A stub provider with no external I/O: every call succeeds immediately
/// and returns a deterministic, incrementing synthetic id. Used by tests
/// and by local (non-cloud) runs of the CLI.
#[derive(Default)]
pub struct LocalProvider {
    counter: AtomicU64,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, kind: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("local-{kind}-{n}")
    }
}

#[async_trait]
impl Provider for LocalProvider {
    async fn create_vpc(&self, _cidr: &str) -> Result<String, ProviderError> {
        Ok(self.next_id("vpc"))
    }

    async fn attach_internet_gateway(&self, _vpc_id: &str) -> Result<String, ProviderError> {
        Ok(self.next_id("igw"))
    }

    async fn create_route_table(&self, _vpc_id: &str) -> Result<String, ProviderError> {
        Ok(self.next_id("rtb"))
    }

    async fn create_route(
        &self,
        _route_table_id: &str,
        _destination_cidr: &str,
        _gateway_id: &str,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn create_subnet(&self, _cidr: &str, _vpc_id: &str) -> Result<String, ProviderError> {
        Ok(self.next_id("subnet"))
    }

    async fn associate_route_table_with_subnet(
        &self,
        _route_table_id: &str,
        _subnet_id: &str,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn create_security_group(
        &self,
        _name: &str,
        _description: &str,
        _vpc_id: &str,
    ) -> Result<String, ProviderError> {
        Ok(self.next_id("sg"))
    }

    async fn authorize_ingress(
        &self,
        _security_group_id: &str,
        _protocol: &str,
        _cidr: &str,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn create_instances(
        &self,
        _image: &str,
        _instance_type: &str,
        _subnet_id: &str,
        _security_group_id: &str,
    ) -> Result<String, ProviderError> {
        Ok(self.next_id("instance"))
    }

    async fn wait_until_running(&self, _instance_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn wait_until_available(&self, _vpc_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn tag_resource(&self, _resource_id: &str, _key: &str, _value: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_distinct_and_kind_tagged() {
        let provider = LocalProvider::new();
        let vpc = provider.create_vpc("192.168.0.0/16").await.unwrap();
        let sg = provider.create_security_group("sg", "desc", &vpc).await.unwrap();
        assert!(vpc.starts_with("local-vpc-"));
        assert!(sg.starts_with("local-sg-"));
        assert_ne!(vpc, sg);
    }
}
