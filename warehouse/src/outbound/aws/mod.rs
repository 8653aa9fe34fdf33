//! AWS SDK adapters for the cloud ports.
//!
//! [`AwsClients`] is the credential and client factory: it builds the four
//! independent service clients (compute network, object storage, identity,
//! cluster management) from one explicit access key pair bound to a single
//! region. The clients share the SDK base configuration but no mutable
//! state. Credentials are not validated at construction; the SDK defers
//! that to the first call, where a rejection surfaces as the relevant
//! port's `Unauthorized` error variant.

mod cluster;
mod identity;
mod network;
mod storage;

pub use cluster::RedshiftClusterApi;
pub use identity::IamIdentityApi;
pub use network::Ec2NetworkApi;
pub use storage::S3ObjectStore;

use std::env;
use std::fmt;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_iam::config::Credentials;

/// Explicit API credentials for the factory.
#[derive(Clone)]
pub struct AccessKeyPair {
    /// Access key identifier.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

impl AccessKeyPair {
    /// Read the conventional credential environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientFactoryError::MissingCredentials`] naming the first
    /// unset or blank variable.
    pub fn from_env() -> Result<Self, ClientFactoryError> {
        Ok(Self {
            access_key_id: required_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required_env("AWS_SECRET_ACCESS_KEY")?,
        })
    }
}

fn required_env(key: &'static str) -> Result<String, ClientFactoryError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ClientFactoryError::MissingCredentials { key })
}

impl fmt::Debug for AccessKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeyPair")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// Errors raised while constructing the client bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientFactoryError {
    /// No region was supplied.
    #[error("an AWS region must be configured")]
    MissingRegion,
    /// A credential environment variable is unset or blank.
    #[error("missing AWS credentials: set {key}")]
    MissingCredentials {
        /// Name of the missing variable.
        key: &'static str,
    },
}

/// Bundle of the four service clients the orchestrator uses.
#[derive(Debug, Clone)]
pub struct AwsClients {
    /// Compute-network client (security groups, ingress rules).
    pub ec2: aws_sdk_ec2::Client,
    /// Object-storage client (source data probes).
    pub s3: aws_sdk_s3::Client,
    /// Identity client (role lifecycle).
    pub iam: aws_sdk_iam::Client,
    /// Cluster-management client.
    pub redshift: aws_sdk_redshift::Client,
}

impl AwsClients {
    /// Build all four clients from an access key pair and a region.
    ///
    /// # Errors
    ///
    /// Returns [`ClientFactoryError::MissingRegion`] when the region is
    /// blank.
    pub async fn connect(
        keys: &AccessKeyPair,
        region: &str,
    ) -> Result<Self, ClientFactoryError> {
        if region.trim().is_empty() {
            return Err(ClientFactoryError::MissingRegion);
        }
        let credentials = Credentials::new(
            keys.access_key_id.clone(),
            keys.secret_access_key.clone(),
            None,
            None,
            "warehouse-settings",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .credentials_provider(credentials)
            .load()
            .await;
        Ok(Self {
            ec2: aws_sdk_ec2::Client::new(&sdk_config),
            s3: aws_sdk_s3::Client::new(&sdk_config),
            iam: aws_sdk_iam::Client::new(&sdk_config),
            redshift: aws_sdk_redshift::Client::new(&sdk_config),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the factory's input validation and redaction.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn blank_region_is_rejected() {
        let keys = AccessKeyPair {
            access_key_id: "AKIA".to_owned(),
            secret_access_key: "secret".to_owned(),
        };
        let error = AwsClients::connect(&keys, "  ")
            .await
            .expect_err("blank region must fail");
        assert_eq!(error, ClientFactoryError::MissingRegion);
    }

    #[rstest]
    fn missing_credential_variables_are_named() {
        let _guard = env_lock::lock_env([
            ("AWS_ACCESS_KEY_ID", None::<String>),
            ("AWS_SECRET_ACCESS_KEY", None),
        ]);

        let error = AccessKeyPair::from_env().expect_err("must be missing");
        assert_eq!(
            error,
            ClientFactoryError::MissingCredentials {
                key: "AWS_ACCESS_KEY_ID"
            }
        );
    }

    #[rstest]
    fn secret_key_is_redacted_from_debug_output() {
        let keys = AccessKeyPair {
            access_key_id: "AKIA".to_owned(),
            secret_access_key: "secret".to_owned(),
        };
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("AKIA"));
        assert!(!rendered.contains("secret"));
    }
}
