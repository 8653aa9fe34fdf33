//! Identity role provisioning for the cluster's object-storage access.
//!
//! The role is created once per deployment and reused thereafter, so the
//! provisioner treats "already exists" as a normal outcome and reports it
//! distinctly. Genuine failures propagate; downstream cluster creation
//! would fail anyway without a usable role, so the caller decides whether
//! to stop.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::ports::{IdentityApi, IdentityApiError};

/// Service principal allowed to assume the provisioned role.
const CLUSTER_SERVICE_PRINCIPAL: &str = "redshift.amazonaws.com";

/// Managed policy granting read-only object-storage access.
pub const STORAGE_READ_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess";

/// What the provisioner should create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    /// Role name, unique within the identity namespace.
    pub name: String,
    /// Managed policy to attach.
    pub policy_arn: String,
}

impl RoleSpec {
    /// Spec for a role with the default read-only storage policy.
    #[must_use]
    pub fn with_default_policy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy_arn: STORAGE_READ_POLICY_ARN.to_owned(),
        }
    }
}

/// How the role came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOutcome {
    /// The provisioner created the role in this run.
    Created,
    /// A role with the requested name already existed and was reused.
    AlreadyExists,
}

/// A usable role with its resolved canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRole {
    /// Role name.
    pub name: String,
    /// Canonical resolved ARN.
    pub arn: String,
    /// Whether the role was created or reused.
    pub outcome: RoleOutcome,
}

/// Errors raised while provisioning the role, tagged with the failing step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleProvisionError {
    /// Role creation was rejected for a reason other than pre-existence.
    #[error("role creation failed: {source}")]
    Create {
        /// Underlying identity failure.
        #[source]
        source: IdentityApiError,
    },
    /// The storage policy could not be attached.
    #[error("policy attachment failed: {source}")]
    AttachPolicy {
        /// Underlying identity failure.
        #[source]
        source: IdentityApiError,
    },
    /// The role exists but its ARN could not be resolved.
    #[error("role lookup failed: {source}")]
    Resolve {
        /// Underlying identity failure.
        #[source]
        source: IdentityApiError,
    },
}

/// Trust policy document permitting only the cluster service to assume the
/// role.
#[must_use]
pub fn trust_policy_document() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": CLUSTER_SERVICE_PRINCIPAL }
        }]
    })
    .to_string()
}

/// Creates (or reuses) the identity role the cluster assumes for
/// object-storage reads.
#[derive(Clone)]
pub struct RoleProvisioner<I> {
    identity: Arc<I>,
}

impl<I> RoleProvisioner<I> {
    /// Build a provisioner over an identity port.
    pub fn new(identity: Arc<I>) -> Self {
        Self { identity }
    }
}

impl<I: IdentityApi> RoleProvisioner<I> {
    /// Ensure the role exists with the fixed trust policy and the requested
    /// managed policy attached, then resolve its ARN.
    ///
    /// # Errors
    ///
    /// Returns a [`RoleProvisionError`] naming the failing step. An
    /// already-existing role is not an error; it is reported through
    /// [`RoleOutcome::AlreadyExists`].
    pub async fn ensure_role(&self, spec: &RoleSpec) -> Result<ProvisionedRole, RoleProvisionError> {
        let outcome = match self
            .identity
            .create_role(
                &spec.name,
                &trust_policy_document(),
                "Allows the analytic cluster to read source data from object storage.",
            )
            .await
        {
            Ok(()) => RoleOutcome::Created,
            Err(IdentityApiError::AlreadyExists { .. }) => RoleOutcome::AlreadyExists,
            Err(source) => return Err(RoleProvisionError::Create { source }),
        };
        info!(role = %spec.name, ?outcome, "identity role ensured");

        self.identity
            .attach_role_policy(&spec.name, &spec.policy_arn)
            .await
            .map_err(|source| RoleProvisionError::AttachPolicy { source })?;

        let arn = self
            .identity
            .resolve_role_arn(&spec.name)
            .await
            .map_err(|source| RoleProvisionError::Resolve { source })?;

        Ok(ProvisionedRole {
            name: spec.name.clone(),
            arn,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Behavioural coverage for role provisioning outcomes.

    use mockall::predicate::eq;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::MockIdentityApi;

    const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/warehouse-storage-read";

    fn spec() -> RoleSpec {
        RoleSpec::with_default_policy("warehouse-storage-read")
    }

    fn provisioner(identity: MockIdentityApi) -> RoleProvisioner<MockIdentityApi> {
        RoleProvisioner::new(Arc::new(identity))
    }

    #[rstest]
    #[tokio::test]
    async fn creates_role_attaches_policy_and_resolves_arn() {
        let mut identity = MockIdentityApi::new();
        identity
            .expect_create_role()
            .withf(|name, trust, _| {
                name == "warehouse-storage-read" && trust.contains("redshift.amazonaws.com")
            })
            .times(1)
            .return_once(|_, _, _| Ok(()));
        identity
            .expect_attach_role_policy()
            .with(eq("warehouse-storage-read"), eq(STORAGE_READ_POLICY_ARN))
            .times(1)
            .return_once(|_, _| Ok(()));
        identity
            .expect_resolve_role_arn()
            .times(1)
            .return_once(|_| Ok(ROLE_ARN.to_owned()));

        let provisioned = provisioner(identity)
            .ensure_role(&spec())
            .await
            .expect("provisioning should succeed");

        assert_eq!(provisioned.outcome, RoleOutcome::Created);
        assert_eq!(provisioned.arn, ROLE_ARN);
    }

    #[rstest]
    #[tokio::test]
    async fn reuses_existing_role_and_still_resolves_arn() {
        let mut identity = MockIdentityApi::new();
        identity
            .expect_create_role()
            .times(1)
            .return_once(|_, _, _| Err(IdentityApiError::already_exists("role exists")));
        identity
            .expect_attach_role_policy()
            .times(1)
            .return_once(|_, _| Ok(()));
        identity
            .expect_resolve_role_arn()
            .times(1)
            .return_once(|_| Ok(ROLE_ARN.to_owned()));

        let provisioned = provisioner(identity)
            .ensure_role(&spec())
            .await
            .expect("reuse should succeed");

        assert_eq!(provisioned.outcome, RoleOutcome::AlreadyExists);
        assert_eq!(provisioned.arn, ROLE_ARN);
    }

    #[rstest]
    #[tokio::test]
    async fn hard_creation_failures_propagate_without_attaching() {
        let mut identity = MockIdentityApi::new();
        identity
            .expect_create_role()
            .times(1)
            .return_once(|_, _, _| Err(IdentityApiError::unauthorized("access denied")));
        identity.expect_attach_role_policy().times(0);
        identity.expect_resolve_role_arn().times(0);

        let error = provisioner(identity)
            .ensure_role(&spec())
            .await
            .expect_err("hard failure must propagate");

        assert!(matches!(
            error,
            RoleProvisionError::Create {
                source: IdentityApiError::Unauthorized { .. }
            }
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn resolve_failures_are_tagged_with_the_lookup_step() {
        let mut identity = MockIdentityApi::new();
        identity
            .expect_create_role()
            .return_once(|_, _, _| Ok(()));
        identity
            .expect_attach_role_policy()
            .return_once(|_, _| Ok(()));
        identity
            .expect_resolve_role_arn()
            .return_once(|_| Err(IdentityApiError::not_found("no such role")));

        let error = provisioner(identity)
            .ensure_role(&spec())
            .await
            .expect_err("lookup failure must propagate");

        assert!(matches!(error, RoleProvisionError::Resolve { .. }));
    }

    #[rstest]
    fn trust_policy_names_only_the_cluster_service_principal() {
        let document = trust_policy_document();
        let parsed: serde_json::Value =
            serde_json::from_str(&document).expect("document should be valid JSON");
        assert_eq!(
            parsed["Statement"][0]["Principal"]["Service"],
            CLUSTER_SERVICE_PRINCIPAL
        );
        assert_eq!(parsed["Statement"][0]["Action"], "sts:AssumeRole");
    }
}
