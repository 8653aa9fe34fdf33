//! Driven port for compute-network security group management.

use async_trait::async_trait;

use super::define_port_error;

/// Reference to a security group resolved from the cluster's VPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRef {
    /// Provider identifier (`sg-...`).
    pub id: String,
    /// Human-readable group name.
    pub name: String,
}

define_port_error! {
    /// Errors raised by the network service.
    pub enum NetworkApiError {
        /// No matching security group or VPC exists.
        NotFound { message: String } =>
            "network entity not found: {message}",
        /// The requested ingress rule already exists.
        DuplicateRule { message: String } =>
            "ingress rule already exists: {message}",
        /// The credentials were rejected or lack permission.
        Unauthorized { message: String } =>
            "network request unauthorized: {message}",
        /// Any other provider failure.
        Api { message: String } =>
            "network api failure: {message}",
    }
}

/// Port for opening inbound access to the cluster endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Resolve the default security group of the given VPC.
    async fn default_security_group(
        &self,
        vpc_id: &str,
    ) -> Result<SecurityGroupRef, NetworkApiError>;

    /// Whether an inbound TCP rule for `cidr` on exactly `port` exists.
    async fn ingress_rule_exists(
        &self,
        group: &SecurityGroupRef,
        cidr: &str,
        port: u16,
    ) -> Result<bool, NetworkApiError>;

    /// Open inbound TCP access on exactly `port` from `cidr`.
    async fn authorize_ingress(
        &self,
        group: &SecurityGroupRef,
        cidr: &str,
        port: u16,
    ) -> Result<(), NetworkApiError>;
}
