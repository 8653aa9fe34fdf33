//! Redshift adapter for the cluster-management port.

use async_trait::async_trait;
use aws_sdk_redshift::Client;
use aws_sdk_redshift::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_redshift::types::Cluster;

use crate::domain::cluster::{ClusterDescriptor, ClusterSpec, ClusterStatus, Endpoint};
use crate::domain::ports::{ClusterApi, ClusterApiError};

/// Cluster-management port implementation over the Redshift client.
#[derive(Debug, Clone)]
pub struct RedshiftClusterApi {
    client: Client,
}

impl RedshiftClusterApi {
    /// Wrap a Redshift client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for RedshiftClusterApi {
    async fn create_cluster(
        &self,
        spec: &ClusterSpec,
    ) -> Result<ClusterDescriptor, ClusterApiError> {
        let output = self
            .client
            .create_cluster()
            .cluster_type(spec.kind.as_provider_str())
            .node_type(&spec.node_type)
            .set_number_of_nodes(spec.provider_node_count().map(i32::from))
            .db_name(&spec.db_name)
            .cluster_identifier(&spec.identifier)
            .master_username(&spec.master.username)
            .master_user_password(spec.master.password.expose())
            .iam_roles(&spec.role_arn)
            .send()
            .await
            .map_err(map_cluster_error)?;
        Ok(output
            .cluster()
            .map_or_else(|| requested_descriptor(&spec.identifier), to_descriptor))
    }

    async fn describe_cluster(
        &self,
        identifier: &str,
    ) -> Result<Option<ClusterDescriptor>, ClusterApiError> {
        let result = self
            .client
            .describe_clusters()
            .cluster_identifier(identifier)
            .send()
            .await;
        match result {
            Ok(output) => Ok(output.clusters().first().map(to_descriptor)),
            Err(error) => match map_cluster_error(error) {
                ClusterApiError::NotFound { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> Result<(), ClusterApiError> {
        self.client
            .delete_cluster()
            .cluster_identifier(identifier)
            .skip_final_cluster_snapshot(skip_final_snapshot)
            .send()
            .await
            .map(|_| ())
            .map_err(map_cluster_error)
    }
}

/// Placeholder view for the window where the provider has accepted the
/// creation request but returned no cluster body.
fn requested_descriptor(identifier: &str) -> ClusterDescriptor {
    ClusterDescriptor {
        identifier: identifier.to_owned(),
        status: ClusterStatus::Requested,
        db_name: None,
        endpoint: None,
        vpc_id: None,
        role_arns: vec![],
    }
}

fn to_descriptor(cluster: &Cluster) -> ClusterDescriptor {
    ClusterDescriptor {
        identifier: cluster.cluster_identifier().unwrap_or_default().to_owned(),
        status: cluster
            .cluster_status()
            .map_or(ClusterStatus::Requested, ClusterStatus::from_provider),
        db_name: cluster.db_name().map(str::to_owned),
        endpoint: cluster.endpoint().and_then(|endpoint| {
            let host = endpoint.address()?.to_owned();
            let port = endpoint.port().and_then(|port| u16::try_from(port).ok())?;
            Some(Endpoint { host, port })
        }),
        vpc_id: cluster.vpc_id().map(str::to_owned),
        role_arns: cluster
            .iam_roles()
            .iter()
            .filter_map(|role| role.iam_role_arn().map(str::to_owned))
            .collect(),
    }
}

fn map_cluster_error<E>(error: SdkError<E>) -> ClusterApiError
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
                "ClusterAlreadyExists" => ClusterApiError::already_exists(message),
                "ClusterNotFound" => ClusterApiError::not_found(message),
                "InvalidParameterValue" | "InvalidParameterCombination"
                | "ClusterQuotaExceeded" | "NumberOfNodesQuotaExceeded"
                | "InsufficientClusterCapacity" => ClusterApiError::rejected(message),
                "AccessDenied" | "AccessDeniedException" | "InvalidClientTokenId"
                | "SignatureDoesNotMatch" | "UnrecognizedClientException" => {
                    ClusterApiError::unauthorized(message)
                }
                "Throttling" | "ThrottlingException" => ClusterApiError::throttled(message),
                _ if status == 403 => ClusterApiError::unauthorized(message),
                _ if status == 429 => ClusterApiError::throttled(message),
                _ => ClusterApiError::api(format!("{code}: {message}")),
            }
        }
        _ => ClusterApiError::api(format!("{error:?}")),
    }
}
