use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::aws::sigv4::{sign_post, Credentials};
use crate::aws::xml::{error_message, first_text};
use crate::error::ProviderError;
use crate::provider::Provider;

/// Static access-key credentials, read once at construction. The teacher's
/// driver also probes ECS task-metadata and IMDSv2 when static credentials
/// are absent; that chain is dropped here (see DESIGN.md) since the
/// provider is explicitly an external collaborator and a single documented
/// credential source is enough to exercise the signing path end to end.
pub struct AwsProviderConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsProviderConfig {
    pub fn from_env() -> Result<Self, ProviderError> {
        let region = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .map_err(|_| ProviderError::NotConfigured("AWS_REGION not set".into()))?;
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| ProviderError::NotConfigured("AWS_ACCESS_KEY_ID not set".into()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| ProviderError::NotConfigured("AWS_SECRET_ACCESS_KEY not set".into()))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
        Ok(Self {
            region,
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// An EC2 Query-API client, signed with SigV4, covering exactly the
/// operations §6 names: VPC, internet gateway, route table, subnet,
/// security group, and instance lifecycle calls.
pub struct AwsProvider {
    config: AwsProviderConfig,
    http: reqwest::Client,
}

impl AwsProvider {
    pub fn new(config: AwsProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn host(&self) -> String {
        format!("ec2.{}.amazonaws.com", self.config.region)
    }

    /// Issues one EC2 Query API action and returns the raw XML response
    /// body, or a `ProviderError` carrying the parsed `<Error>` if the
    /// service rejected the call.
    async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<String, ProviderError> {
        let mut body = format!("Action={action}&Version=2016-11-15");
        for (k, v) in params {
            body.push('&');
            body.push_str(k);
            body.push('=');
            body.push_str(&urlencode(v));
        }
        if let Some(token) = &self.config.session_token {
            body.push_str("&SecurityToken=");
            body.push_str(&urlencode(token));
        }

        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let host = self.host();

        let creds = Credentials {
            access_key_id: self.config.access_key_id.clone(),
            secret_access_key: self.config.secret_access_key.clone(),
            session_token: self.config.session_token.clone(),
        };
        let signed = sign_post(&creds, &self.config.region, "ec2", &host, &body, &amz_date, &date_stamp);

        debug!(action, host = %host, "calling EC2 query API");

        let mut request = self
            .http
            .post(format!("https://{host}/"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("X-Amz-Date", signed.amz_date)
            .header("X-Amz-Content-Sha256", signed.content_sha256)
            .header("Authorization", signed.authorization)
            .body(body);
        if let Some(token) = &self.config.session_token {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::CallFailed(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::CallFailed(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| text.clone());
            return Err(ProviderError::CallFailed(format!("{action} failed: {message}")));
        }
        Ok(text)
    }

}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[async_trait]
impl Provider for AwsProvider {
    async fn create_vpc(&self, cidr: &str) -> Result<String, ProviderError> {
        let body = self.call("CreateVpc", &[("CidrBlock", cidr)]).await?;
        first_text(&body, "vpcId").ok_or_else(|| ProviderError::CallFailed("CreateVpc: no vpcId in response".into()))
    }

    async fn attach_internet_gateway(&self, vpc_id: &str) -> Result<String, ProviderError> {
        let body = self.call("CreateInternetGateway", &[]).await?;
        let gateway_id = first_text(&body, "internetGatewayId")
            .ok_or_else(|| ProviderError::CallFailed("CreateInternetGateway: no internetGatewayId".into()))?;
        self.call(
            "AttachInternetGateway",
            &[("InternetGatewayId", &gateway_id), ("VpcId", vpc_id)],
        )
        .await?;
        Ok(gateway_id)
    }

    async fn create_route_table(&self, vpc_id: &str) -> Result<String, ProviderError> {
        let body = self.call("CreateRouteTable", &[("VpcId", vpc_id)]).await?;
        first_text(&body, "routeTableId")
            .ok_or_else(|| ProviderError::CallFailed("CreateRouteTable: no routeTableId".into()))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        gateway_id: &str,
    ) -> Result<(), ProviderError> {
        self.call(
            "CreateRoute",
            &[
                ("RouteTableId", route_table_id),
                ("DestinationCidrBlock", destination_cidr),
                ("GatewayId", gateway_id),
            ],
        )
        .await?;
        Ok(())
    }

    async fn create_subnet(&self, cidr: &str, vpc_id: &str) -> Result<String, ProviderError> {
        let body = self
            .call("CreateSubnet", &[("CidrBlock", cidr), ("VpcId", vpc_id)])
            .await?;
        first_text(&body, "subnetId").ok_or_else(|| ProviderError::CallFailed("CreateSubnet: no subnetId".into()))
    }

    async fn associate_route_table_with_subnet(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<(), ProviderError> {
        self.call(
            "AssociateRouteTable",
            &[("RouteTableId", route_table_id), ("SubnetId", subnet_id)],
        )
        .await?;
        Ok(())
    }

    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String, ProviderError> {
        let body = self
            .call(
                "CreateSecurityGroup",
                &[("GroupName", name), ("GroupDescription", description), ("VpcId", vpc_id)],
            )
            .await?;
        first_text(&body, "groupId").ok_or_else(|| ProviderError::CallFailed("CreateSecurityGroup: no groupId".into()))
    }

    async fn authorize_ingress(
        &self,
        security_group_id: &str,
        protocol: &str,
        cidr: &str,
    ) -> Result<(), ProviderError> {
        self.call(
            "AuthorizeSecurityGroupIngress",
            &[
                ("GroupId", security_group_id),
                ("IpPermissions.1.IpProtocol", protocol),
                ("IpPermissions.1.IpRanges.1.CidrIp", cidr),
            ],
        )
        .await?;
        Ok(())
    }

    async fn create_instances(
        &self,
        image: &str,
        instance_type: &str,
        subnet_id: &str,
        security_group_id: &str,
    ) -> Result<String, ProviderError> {
        let body = self
            .call(
                "RunInstances",
                &[
                    ("ImageId", image),
                    ("InstanceType", instance_type),
                    ("MinCount", "1"),
                    ("MaxCount", "1"),
                    ("NetworkInterface.1.SubnetId", subnet_id),
                    ("NetworkInterface.1.SecurityGroupId.1", security_group_id),
                    ("NetworkInterface.1.DeviceIndex", "0"),
                ],
            )
            .await?;
        first_text(&body, "instanceId").ok_or_else(|| ProviderError::CallFailed("RunInstances: no instanceId".into()))
    }

    async fn wait_until_running(&self, instance_id: &str) -> Result<(), ProviderError> {
        for _ in 0..60 {
            let body = self
                .call("DescribeInstances", &[("InstanceId.1", instance_id)])
                .await?;
            if first_text(&body, "name").as_deref() == Some("running") {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        Err(ProviderError::CallFailed(format!(
            "timed out waiting for instance {instance_id} to reach running"
        )))
    }

    async fn wait_until_available(&self, vpc_id: &str) -> Result<(), ProviderError> {
        for _ in 0..60 {
            let body = self.call("DescribeVpcs", &[("VpcId.1", vpc_id)]).await?;
            if first_text(&body, "state").as_deref() == Some("available") {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        Err(ProviderError::CallFailed(format!(
            "timed out waiting for vpc {vpc_id} to become available"
        )))
    }

    async fn tag_resource(&self, resource_id: &str, key: &str, value: &str) -> Result<(), ProviderError> {
        self.call(
            "CreateTags",
            &[("ResourceId.1", resource_id), ("Tag.1.Key", key), ("Tag.1.Value", value)],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_passes_through_unreserved_characters() {
        assert_eq!(urlencode("abc-DEF_123.~"), "abc-DEF_123.~");
    }

    #[test]
    fn urlencode_percent_encodes_everything_else() {
        assert_eq!(urlencode("192.168.0.0/16"), "192.168.0.0%2F16");
        assert_eq!(urlencode("a b"), "a%20b");
    }

    #[test]
    fn host_is_region_scoped() {
        let provider = AwsProvider::new(AwsProviderConfig {
            region: "us-west-2".into(),
            access_key_id: "AKID".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        });
        assert_eq!(provider.host(), "ec2.us-west-2.amazonaws.com");
    }
}
