//! EC2 adapter for the network port.

use async_trait::async_trait;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{Filter, IpPermission};

use crate::domain::ports::{NetworkApi, NetworkApiError, SecurityGroupRef};

/// Network port implementation over the EC2 client.
#[derive(Debug, Clone)]
pub struct Ec2NetworkApi {
    client: Client,
}

impl Ec2NetworkApi {
    /// Wrap an EC2 client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NetworkApi for Ec2NetworkApi {
    async fn default_security_group(
        &self,
        vpc_id: &str,
    ) -> Result<SecurityGroupRef, NetworkApiError> {
        let output = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(Filter::builder().name("group-name").values("default").build())
            .send()
            .await
            .map_err(map_network_error)?;
        output
            .security_groups()
            .first()
            .and_then(|group| {
                Some(SecurityGroupRef {
                    id: group.group_id()?.to_owned(),
                    name: group.group_name().unwrap_or("default").to_owned(),
                })
            })
            .ok_or_else(|| {
                NetworkApiError::not_found(format!("no default security group in VPC '{vpc_id}'"))
            })
    }

    async fn ingress_rule_exists(
        &self,
        group: &SecurityGroupRef,
        cidr: &str,
        port: u16,
    ) -> Result<bool, NetworkApiError> {
        let output = self
            .client
            .describe_security_groups()
            .group_ids(&group.id)
            .send()
            .await
            .map_err(map_network_error)?;
        Ok(output
            .security_groups()
            .iter()
            .flat_map(|observed| observed.ip_permissions())
            .any(|permission| permission_matches(permission, cidr, port)))
    }

    async fn authorize_ingress(
        &self,
        group: &SecurityGroupRef,
        cidr: &str,
        port: u16,
    ) -> Result<(), NetworkApiError> {
        self.client
            .authorize_security_group_ingress()
            .group_id(&group.id)
            .ip_protocol("tcp")
            .cidr_ip(cidr)
            .from_port(i32::from(port))
            .to_port(i32::from(port))
            .send()
            .await
            .map(|_| ())
            .map_err(map_network_error)
    }
}

/// Whether an existing permission grants TCP access from `cidr` on exactly
/// `port`.
fn permission_matches(permission: &IpPermission, cidr: &str, port: u16) -> bool {
    let port = i32::from(port);
    permission
        .ip_protocol()
        .is_some_and(|protocol| protocol.eq_ignore_ascii_case("tcp"))
        && permission.from_port() == Some(port)
        && permission.to_port() == Some(port)
        && permission
            .ip_ranges()
            .iter()
            .any(|range| range.cidr_ip() == Some(cidr))
}

fn map_network_error<E>(error: SdkError<E>) -> NetworkApiError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    match &error {
        SdkError::ServiceError(service_err) => {
            let code = service_err.err().code().unwrap_or_default().to_owned();
            let message = service_err
                .err()
                .message()
                .map_or_else(|| format!("{error:?}"), str::to_owned);
            let status = service_err.raw().status().as_u16();
            match code.as_str() {
                "InvalidPermission.Duplicate" => NetworkApiError::duplicate_rule(message),
                "InvalidGroup.NotFound" | "InvalidGroupId.Malformed"
                | "InvalidVpcID.NotFound" => NetworkApiError::not_found(message),
                "UnauthorizedOperation" | "AuthFailure" => {
                    NetworkApiError::unauthorized(message)
                }
                _ if status == 403 => NetworkApiError::unauthorized(message),
                _ => NetworkApiError::api(format!("{code}: {message}")),
            }
        }
        _ => NetworkApiError::api(format!("{error:?}")),
    }
}
