//! Cluster lifecycle orchestration: provision, await readiness, authorize
//! network access, tear down.
//!
//! The lifecycle is a state machine over a single cluster:
//! `absent -> requested -> creating -> available`, and
//! `available -> deleting -> absent` on teardown. Waiting is bounded by an
//! explicit [`PollPolicy`] and a caller-triggered [`CancelFlag`]; terminal
//! provider states surface as [`LifecycleError::ClusterFailed`] instead of
//! blocking forever. Teardown is best effort: both deletions are attempted
//! independently and the result is a [`TeardownReport`] rather than an
//! error, so cleanup never stops halfway.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::domain::cluster::{ClusterDescriptor, ClusterSpec, ClusterSpecError, ClusterStatus};
use crate::domain::ports::{
    ClusterApi, ClusterApiError, IdentityApi, IdentityApiError, NetworkApi, NetworkApiError,
};
use crate::domain::provision::RoleSpec;

/// Source range for inbound access: any address.
const OPEN_CIDR: &str = "0.0.0.0/0";

/// Bounds for the readiness poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status queries.
    pub interval: Duration,
    /// Total time budget before giving up.
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(900),
        }
    }
}

/// Caller-settable flag that aborts the readiness wait at the next poll
/// tick.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed at the next poll tick.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of authorizing inbound access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressOutcome {
    /// A new ingress rule was created.
    Authorized,
    /// An equivalent rule already existed; nothing was changed.
    AlreadyAuthorized,
}

/// Result of one best-effort deletion during teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The resource was deleted in this run.
    Deleted,
    /// The resource was already gone.
    AlreadyAbsent,
    /// Deletion failed; the resource may still exist.
    Failed {
        /// Provider diagnostic.
        message: String,
    },
}

impl CleanupOutcome {
    /// Whether this outcome leaves no billable resource behind.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Per-resource outcomes of a teardown attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    /// Outcome of the cluster deletion.
    pub cluster: CleanupOutcome,
    /// Outcome of the role detach-and-delete.
    pub role: CleanupOutcome,
}

impl TeardownReport {
    /// Whether every resource is confirmed gone or going.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.cluster.is_clean() && self.role.is_clean()
    }
}

/// Errors raised by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The cluster spec would be rejected by the provider.
    #[error("invalid cluster spec: {source}")]
    InvalidSpec {
        /// Validation failure.
        #[source]
        source: ClusterSpecError,
    },
    /// The creation request was rejected.
    #[error("cluster creation failed: {source}")]
    Provision {
        /// Underlying provider failure.
        #[source]
        source: ClusterApiError,
    },
    /// A status query failed.
    #[error("cluster status query failed: {source}")]
    Describe {
        /// Underlying provider failure.
        #[source]
        source: ClusterApiError,
    },
    /// The cluster entered a state it cannot recover from.
    #[error("cluster entered terminal state '{status}'")]
    ClusterFailed {
        /// Observed terminal status.
        status: ClusterStatus,
    },
    /// The cluster did not become available within the poll budget.
    #[error(
        "cluster did not become available within {}s (last status: {last_status})",
        waited.as_secs()
    )]
    TimedOut {
        /// Time spent waiting.
        waited: Duration,
        /// Status observed on the final poll.
        last_status: ClusterStatus,
    },
    /// The caller cancelled the wait.
    #[error("readiness wait cancelled")]
    Cancelled,
    /// The provider did not report a VPC for the cluster.
    #[error("cluster '{identifier}' reports no VPC; cannot authorize access")]
    MissingVpc {
        /// Cluster identifier.
        identifier: String,
    },
    /// A network operation failed.
    #[error("network authorization failed: {source}")]
    Network {
        /// Underlying provider failure.
        #[source]
        source: NetworkApiError,
    },
}

/// Orchestrates the cluster lifecycle over the cloud ports.
#[derive(Clone)]
pub struct ClusterLifecycle<C, N, I> {
    cluster_api: Arc<C>,
    network_api: Arc<N>,
    identity_api: Arc<I>,
}

impl<C, N, I> ClusterLifecycle<C, N, I> {
    /// Build a lifecycle manager over the cluster, network, and identity
    /// ports.
    pub fn new(cluster_api: Arc<C>, network_api: Arc<N>, identity_api: Arc<I>) -> Self {
        Self {
            cluster_api,
            network_api,
            identity_api,
        }
    }
}

impl<C, N, I> ClusterLifecycle<C, N, I>
where
    C: ClusterApi,
    N: NetworkApi,
    I: IdentityApi,
{
    /// Issue a single cluster-creation request.
    ///
    /// Requesting creation while a cluster with the same identifier is
    /// creating or available is the caller's responsibility to avoid; the
    /// provider's rejection is surfaced as [`LifecycleError::Provision`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidSpec`] for specs the provider would
    /// reject outright and [`LifecycleError::Provision`] for provider
    /// rejections.
    pub async fn provision(&self, spec: &ClusterSpec) -> Result<ClusterDescriptor, LifecycleError> {
        spec.validate()
            .map_err(|source| LifecycleError::InvalidSpec { source })?;
        let descriptor = self
            .cluster_api
            .create_cluster(spec)
            .await
            .map_err(|source| LifecycleError::Provision { source })?;
        info!(
            cluster = %descriptor.identifier,
            status = %descriptor.status,
            "cluster creation requested"
        );
        Ok(descriptor)
    }

    /// Poll the cluster's status until it becomes available.
    ///
    /// Each poll is a fresh status query; nothing is cached. The wait is
    /// bounded by `policy.max_wait` and can be aborted through `cancel`,
    /// which is observed at the next poll tick.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ClusterFailed`] when the cluster enters a
    /// terminal state, [`LifecycleError::TimedOut`] when the budget is
    /// exhausted, [`LifecycleError::Cancelled`] on caller abort, and
    /// [`LifecycleError::Describe`] when a status query fails.
    pub async fn await_ready(
        &self,
        identifier: &str,
        policy: PollPolicy,
        cancel: &CancelFlag,
    ) -> Result<ClusterDescriptor, LifecycleError> {
        let started = Instant::now();
        let mut last_status = ClusterStatus::Requested;
        loop {
            if cancel.is_cancelled() {
                return Err(LifecycleError::Cancelled);
            }
            let observed = self
                .cluster_api
                .describe_cluster(identifier)
                .await
                .map_err(|source| LifecycleError::Describe { source })?;
            match observed {
                Some(descriptor) if descriptor.status == ClusterStatus::Available => {
                    info!(cluster = %identifier, "cluster is available");
                    return Ok(descriptor);
                }
                Some(descriptor) if descriptor.status.is_terminal_failure() => {
                    return Err(LifecycleError::ClusterFailed {
                        status: descriptor.status,
                    });
                }
                Some(descriptor) => {
                    last_status = descriptor.status;
                }
                // A just-requested cluster may briefly be unknown to the
                // provider; keep polling within the budget.
                None => {
                    last_status = ClusterStatus::Absent;
                }
            }
            if started.elapsed() >= policy.max_wait {
                return Err(LifecycleError::TimedOut {
                    waited: started.elapsed(),
                    last_status,
                });
            }
            info!(cluster = %identifier, status = %last_status, "waiting for cluster");
            tokio::time::sleep(policy.interval).await;
        }
    }

    /// Open inbound TCP access to the cluster's port from any address.
    ///
    /// The check-then-create sequence makes the operation idempotent: an
    /// existing equivalent rule short-circuits to
    /// [`IngressOutcome::AlreadyAuthorized`], and a duplicate-rule response
    /// from a concurrent writer is absorbed the same way.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MissingVpc`] when the descriptor carries no
    /// VPC and [`LifecycleError::Network`] for provider failures.
    pub async fn authorize_access(
        &self,
        descriptor: &ClusterDescriptor,
        port: u16,
    ) -> Result<IngressOutcome, LifecycleError> {
        let vpc_id = descriptor
            .vpc_id
            .as_deref()
            .ok_or_else(|| LifecycleError::MissingVpc {
                identifier: descriptor.identifier.clone(),
            })?;
        let group = self
            .network_api
            .default_security_group(vpc_id)
            .await
            .map_err(|source| LifecycleError::Network { source })?;
        let exists = self
            .network_api
            .ingress_rule_exists(&group, OPEN_CIDR, port)
            .await
            .map_err(|source| LifecycleError::Network { source })?;
        if exists {
            info!(group = %group.id, port, "ingress rule already present");
            return Ok(IngressOutcome::AlreadyAuthorized);
        }
        match self
            .network_api
            .authorize_ingress(&group, OPEN_CIDR, port)
            .await
        {
            Ok(()) => {
                info!(group = %group.id, port, "ingress rule created");
                Ok(IngressOutcome::Authorized)
            }
            Err(NetworkApiError::DuplicateRule { .. }) => Ok(IngressOutcome::AlreadyAuthorized),
            Err(source) => Err(LifecycleError::Network { source }),
        }
    }

    /// Delete the cluster and the identity role, best effort.
    ///
    /// Cluster deletion skips the final snapshot. Each resource is handled
    /// independently so one failure never prevents attempting the other;
    /// already-absent resources count as clean outcomes.
    pub async fn teardown(&self, identifier: &str, role: &RoleSpec) -> TeardownReport {
        let cluster = match self.cluster_api.delete_cluster(identifier, true).await {
            Ok(()) => {
                info!(cluster = %identifier, "cluster deletion requested");
                CleanupOutcome::Deleted
            }
            Err(ClusterApiError::NotFound { .. }) => {
                info!(cluster = %identifier, "cluster already absent");
                CleanupOutcome::AlreadyAbsent
            }
            Err(error) => {
                warn!(cluster = %identifier, %error, "cluster deletion failed");
                CleanupOutcome::Failed {
                    message: error.to_string(),
                }
            }
        };

        let role_outcome = self.delete_role(role).await;

        TeardownReport {
            cluster,
            role: role_outcome,
        }
    }

    async fn delete_role(&self, role: &RoleSpec) -> CleanupOutcome {
        match self
            .identity_api
            .detach_role_policy(&role.name, &role.policy_arn)
            .await
        {
            Ok(()) | Err(IdentityApiError::NotFound { .. }) => {}
            // Deletion below will fail while the policy is attached; let it
            // report the failure rather than stopping here.
            Err(error) => {
                warn!(role = %role.name, %error, "policy detachment failed");
            }
        }
        match self.identity_api.delete_role(&role.name).await {
            Ok(()) => {
                info!(role = %role.name, "role deleted");
                CleanupOutcome::Deleted
            }
            Err(IdentityApiError::NotFound { .. }) => {
                info!(role = %role.name, "role already absent");
                CleanupOutcome::AlreadyAbsent
            }
            Err(error) => {
                warn!(role = %role.name, %error, "role deletion failed");
                CleanupOutcome::Failed {
                    message: error.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Behavioural coverage for the lifecycle state machine.

    use std::sync::atomic::AtomicUsize;

    use rstest::rstest;

    use super::*;
    use crate::domain::cluster::{ClusterKind, MasterCredentials, MasterPassword};
    use crate::domain::ports::{
        MockClusterApi, MockIdentityApi, MockNetworkApi, SecurityGroupRef,
    };

    const CLUSTER_ID: &str = "analytics";

    fn descriptor(status: ClusterStatus) -> ClusterDescriptor {
        ClusterDescriptor {
            identifier: CLUSTER_ID.to_owned(),
            status,
            db_name: Some("analytics".to_owned()),
            endpoint: None,
            vpc_id: Some("vpc-123".to_owned()),
            role_arns: vec![],
        }
    }

    fn spec() -> ClusterSpec {
        ClusterSpec {
            identifier: CLUSTER_ID.to_owned(),
            kind: ClusterKind::MultiNode,
            node_type: "dc2.large".to_owned(),
            number_of_nodes: 4,
            db_name: "analytics".to_owned(),
            master: MasterCredentials {
                username: "admin".to_owned(),
                password: MasterPassword::new("hunter2"),
            },
            role_arn: "arn:aws:iam::1:role/storage-read".to_owned(),
        }
    }

    fn role() -> RoleSpec {
        RoleSpec::with_default_policy("warehouse-storage-read")
    }

    fn lifecycle(
        cluster_api: MockClusterApi,
        network_api: MockNetworkApi,
        identity_api: MockIdentityApi,
    ) -> ClusterLifecycle<MockClusterApi, MockNetworkApi, MockIdentityApi> {
        ClusterLifecycle::new(
            Arc::new(cluster_api),
            Arc::new(network_api),
            Arc::new(identity_api),
        )
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_secs(5),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn provision_rejects_malformed_specs_before_calling_the_provider() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api.expect_create_cluster().times(0);

        let mut invalid = spec();
        invalid.number_of_nodes = 1;
        let error = lifecycle(cluster_api, MockNetworkApi::new(), MockIdentityApi::new())
            .provision(&invalid)
            .await
            .expect_err("one multi-node node must fail");

        assert!(matches!(error, LifecycleError::InvalidSpec { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn await_ready_returns_once_the_cluster_reports_available() {
        let polls = AtomicUsize::new(0);
        let mut cluster_api = MockClusterApi::new();
        cluster_api
            .expect_describe_cluster()
            .times(3)
            .returning(move |_| {
                let poll = polls.fetch_add(1, Ordering::SeqCst);
                if poll < 2 {
                    Ok(Some(descriptor(ClusterStatus::Creating)))
                } else {
                    Ok(Some(descriptor(ClusterStatus::Available)))
                }
            });

        let ready = lifecycle(cluster_api, MockNetworkApi::new(), MockIdentityApi::new())
            .await_ready(CLUSTER_ID, fast_policy(), &CancelFlag::new())
            .await
            .expect("cluster should become available");

        assert_eq!(ready.status, ClusterStatus::Available);
    }

    #[rstest]
    #[tokio::test]
    async fn await_ready_times_out_with_the_last_observed_status() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api
            .expect_describe_cluster()
            .returning(|_| Ok(Some(descriptor(ClusterStatus::Creating))));

        let policy = PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(10),
        };
        let error = lifecycle(cluster_api, MockNetworkApi::new(), MockIdentityApi::new())
            .await_ready(CLUSTER_ID, policy, &CancelFlag::new())
            .await
            .expect_err("must time out");

        match error {
            LifecycleError::TimedOut { last_status, .. } => {
                assert_eq!(last_status, ClusterStatus::Creating);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn await_ready_surfaces_terminal_cluster_states() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api.expect_describe_cluster().returning(|_| {
            Ok(Some(descriptor(ClusterStatus::from_provider(
                "hardware-failure",
            ))))
        });

        let error = lifecycle(cluster_api, MockNetworkApi::new(), MockIdentityApi::new())
            .await_ready(CLUSTER_ID, fast_policy(), &CancelFlag::new())
            .await
            .expect_err("terminal state must fail");

        assert!(matches!(error, LifecycleError::ClusterFailed { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn await_ready_honors_cancellation_before_polling() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api.expect_describe_cluster().times(0);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let error = lifecycle(cluster_api, MockNetworkApi::new(), MockIdentityApi::new())
            .await_ready(CLUSTER_ID, fast_policy(), &cancel)
            .await
            .expect_err("cancelled wait must fail");

        assert_eq!(error, LifecycleError::Cancelled);
    }

    #[rstest]
    #[tokio::test]
    async fn authorize_access_skips_creation_when_the_rule_exists() {
        let mut network_api = MockNetworkApi::new();
        network_api
            .expect_default_security_group()
            .return_once(|_| {
                Ok(SecurityGroupRef {
                    id: "sg-1".to_owned(),
                    name: "default".to_owned(),
                })
            });
        network_api
            .expect_ingress_rule_exists()
            .return_once(|_, _, _| Ok(true));
        network_api.expect_authorize_ingress().times(0);

        let outcome = lifecycle(MockClusterApi::new(), network_api, MockIdentityApi::new())
            .authorize_access(&descriptor(ClusterStatus::Available), 5439)
            .await
            .expect("authorization should succeed");

        assert_eq!(outcome, IngressOutcome::AlreadyAuthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn authorize_access_creates_the_rule_when_missing() {
        let mut network_api = MockNetworkApi::new();
        network_api
            .expect_default_security_group()
            .return_once(|_| {
                Ok(SecurityGroupRef {
                    id: "sg-1".to_owned(),
                    name: "default".to_owned(),
                })
            });
        network_api
            .expect_ingress_rule_exists()
            .return_once(|_, _, _| Ok(false));
        network_api
            .expect_authorize_ingress()
            .withf(|group, cidr, port| group.id == "sg-1" && cidr == OPEN_CIDR && *port == 5439)
            .times(1)
            .return_once(|_, _, _| Ok(()));

        let outcome = lifecycle(MockClusterApi::new(), network_api, MockIdentityApi::new())
            .authorize_access(&descriptor(ClusterStatus::Available), 5439)
            .await
            .expect("authorization should succeed");

        assert_eq!(outcome, IngressOutcome::Authorized);
    }

    #[rstest]
    #[tokio::test]
    async fn authorize_access_requires_a_vpc() {
        let mut bare = descriptor(ClusterStatus::Available);
        bare.vpc_id = None;

        let error = lifecycle(
            MockClusterApi::new(),
            MockNetworkApi::new(),
            MockIdentityApi::new(),
        )
        .authorize_access(&bare, 5439)
        .await
        .expect_err("missing vpc must fail");

        assert!(matches!(error, LifecycleError::MissingVpc { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn teardown_reports_already_absent_resources_as_clean() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api
            .expect_delete_cluster()
            .return_once(|_, _| Err(ClusterApiError::not_found("no such cluster")));
        let mut identity_api = MockIdentityApi::new();
        identity_api
            .expect_detach_role_policy()
            .return_once(|_, _| Err(IdentityApiError::not_found("no such role")));
        identity_api
            .expect_delete_role()
            .return_once(|_| Err(IdentityApiError::not_found("no such role")));

        let report = lifecycle(cluster_api, MockNetworkApi::new(), identity_api)
            .teardown(CLUSTER_ID, &role())
            .await;

        assert_eq!(report.cluster, CleanupOutcome::AlreadyAbsent);
        assert_eq!(report.role, CleanupOutcome::AlreadyAbsent);
        assert!(report.is_clean());
    }

    #[rstest]
    #[tokio::test]
    async fn teardown_attempts_role_cleanup_even_when_cluster_deletion_fails() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api
            .expect_delete_cluster()
            .return_once(|_, _| Err(ClusterApiError::api("internal error")));
        let mut identity_api = MockIdentityApi::new();
        identity_api
            .expect_detach_role_policy()
            .times(1)
            .return_once(|_, _| Ok(()));
        identity_api
            .expect_delete_role()
            .times(1)
            .return_once(|_| Ok(()));

        let report = lifecycle(cluster_api, MockNetworkApi::new(), identity_api)
            .teardown(CLUSTER_ID, &role())
            .await;

        assert!(matches!(report.cluster, CleanupOutcome::Failed { .. }));
        assert_eq!(report.role, CleanupOutcome::Deleted);
        assert!(!report.is_clean());
    }

    #[rstest]
    #[tokio::test]
    async fn teardown_deletes_both_resources_when_present() {
        let mut cluster_api = MockClusterApi::new();
        cluster_api
            .expect_delete_cluster()
            .withf(|id, skip_snapshot| id == CLUSTER_ID && *skip_snapshot)
            .times(1)
            .return_once(|_, _| Ok(()));
        let mut identity_api = MockIdentityApi::new();
        identity_api
            .expect_detach_role_policy()
            .times(1)
            .return_once(|_, _| Ok(()));
        identity_api
            .expect_delete_role()
            .times(1)
            .return_once(|_| Ok(()));

        let report = lifecycle(cluster_api, MockNetworkApi::new(), identity_api)
            .teardown(CLUSTER_ID, &role())
            .await;

        assert_eq!(report.cluster, CleanupOutcome::Deleted);
        assert_eq!(report.role, CleanupOutcome::Deleted);
        assert!(report.is_clean());
    }
}
