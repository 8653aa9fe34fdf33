//! Driven port for the cloud identity service.
//!
//! Covers the role lifecycle the provisioner and teardown paths need:
//! create, attach/detach policy, resolve, delete. Adapters classify the
//! provider's responses into the error variants below so domain services can
//! absorb the benign kinds (already exists, already absent) and propagate
//! the rest.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by the identity service.
    pub enum IdentityApiError {
        /// The role (or attachment) already exists with the requested name.
        AlreadyExists { message: String } =>
            "identity entity already exists: {message}",
        /// The role (or attachment) does not exist.
        NotFound { message: String } =>
            "identity entity not found: {message}",
        /// The credentials were rejected or lack permission.
        Unauthorized { message: String } =>
            "identity request unauthorized: {message}",
        /// The provider throttled the request.
        Throttled { message: String } =>
            "identity request throttled: {message}",
        /// Any other provider failure.
        Api { message: String } =>
            "identity api failure: {message}",
    }
}

/// Port for managing the identity role the cluster assumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Create a role with the given trust policy document.
    async fn create_role(
        &self,
        role_name: &str,
        trust_policy: &str,
        description: &str,
    ) -> Result<(), IdentityApiError>;

    /// Attach a managed policy to the role. Idempotent at the provider.
    async fn attach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), IdentityApiError>;

    /// Resolve the role's canonical ARN.
    async fn resolve_role_arn(&self, role_name: &str) -> Result<String, IdentityApiError>;

    /// Detach a managed policy from the role.
    async fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), IdentityApiError>;

    /// Delete the role. Fails while principals still depend on it.
    async fn delete_role(&self, role_name: &str) -> Result<(), IdentityApiError>;
}
