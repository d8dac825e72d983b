use async_trait::async_trait;

use crate::error::ProviderError;

/// The capability set a provider-effectful task needs: opaque create /
/// attach / wait / tag operations against a cloud API. All calls are
/// synchronous from the task's point of view and may fail; none are
/// idempotent (see §7's note on provider-id-reservation as a future
/// refinement for retry safety).
#[async_trait]
pub trait Provider: Send + Sync {
    async fn create_vpc(&self, cidr: &str) -> Result<String, ProviderError>;

    /// Creates an internet gateway and attaches it to the given VPC,
    /// returning the gateway id.
    async fn attach_internet_gateway(&self, vpc_id: &str) -> Result<String, ProviderError>;

    async fn create_route_table(&self, vpc_id: &str) -> Result<String, ProviderError>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<(), ProviderError>;

    async fn create_subnet(&self, cidr: &str, vpc_id: &str) -> Result<String, ProviderError>;

    async fn associate_route_table_with_subnet(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<(), ProviderError>;

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String, ProviderError>;

    async fn authorize_ingress(
        &self,
        security_group_id: &str,
        protocol: &str,
        cidr: &str,
    ) -> Result<(), ProviderError>;

    async fn create_instances(
        &self,
        image: &str,
        instance_type: &str,
        subnet_id: &str,
        security_group_id: &str,
    ) -> Result<String, ProviderError>;

    async fn wait_until_running(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn wait_until_available(&self, vpc_id: &str) -> Result<(), ProviderError>;

    async fn tag_resource(&self, resource_id: &str, key: &str, value: &str) -> Result<(), ProviderError>;
}
