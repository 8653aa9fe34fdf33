//! IAM adapter for the identity port.

use async_trait::async_trait;
use aws_sdk_iam::Client;
use aws_sdk_iam::error::{ProvideErrorMetadata, SdkError};

use crate::domain::ports::{IdentityApi, IdentityApiError};

/// Identity port implementation over the IAM client.
#[derive(Debug, Clone)]
pub struct IamIdentityApi {
    client: Client,
}

impl IamIdentityApi {
    /// Wrap an IAM client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityApi for IamIdentityApi {
    async fn create_role(
        &self,
        role_name: &str,
        trust_policy: &str,
        description: &str,
    ) -> Result<(), IdentityApiError> {
        self.client
            .create_role()
            .path("/")
            .role_name(role_name)
            .description(description)
            .assume_role_policy_document(trust_policy)
            .send()
            .await
            .map(|_| ())
            .map_err(map_identity_error)
    }

    async fn attach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), IdentityApiError> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(map_identity_error)
    }

    async fn resolve_role_arn(&self, role_name: &str) -> Result<String, IdentityApiError> {
        let output = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(map_identity_error)?;
        output
            .role()
            .map(|role| role.arn().to_owned())
            .ok_or_else(|| {
                IdentityApiError::api(format!("provider returned no role for '{role_name}'"))
            })
    }

    async fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), IdentityApiError> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(map_identity_error)
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), IdentityApiError> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map(|_| ())
            .map_err(map_identity_error)
    }
}

fn map_identity_error<E>(error: SdkError<E>) -> IdentityApiError
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
                "EntityAlreadyExists" => IdentityApiError::already_exists(message),
                "NoSuchEntity" => IdentityApiError::not_found(message),
                "AccessDenied" | "AccessDeniedException" | "InvalidClientTokenId"
                | "SignatureDoesNotMatch" | "UnrecognizedClientException" => {
                    IdentityApiError::unauthorized(message)
                }
                "Throttling" | "ThrottlingException" => IdentityApiError::throttled(message),
                _ if status == 403 => IdentityApiError::unauthorized(message),
                _ if status == 429 => IdentityApiError::throttled(message),
                _ => IdentityApiError::api(format!("{code}: {message}")),
            }
        }
        _ => IdentityApiError::api(format!("{error:?}")),
    }
}
