//! Driven port for the cluster-management service.

use async_trait::async_trait;

use crate::domain::cluster::{ClusterDescriptor, ClusterSpec};

use super::define_port_error;

define_port_error! {
    /// Errors raised by the cluster-management service.
    pub enum ClusterApiError {
        /// A cluster with the requested identifier already exists.
        AlreadyExists { message: String } =>
            "cluster already exists: {message}",
        /// The cluster does not exist.
        NotFound { message: String } =>
            "cluster not found: {message}",
        /// The creation request was rejected (quota, malformed parameters).
        Rejected { message: String } =>
            "cluster request rejected: {message}",
        /// The credentials were rejected or lack permission.
        Unauthorized { message: String } =>
            "cluster request unauthorized: {message}",
        /// The provider throttled the request.
        Throttled { message: String } =>
            "cluster request throttled: {message}",
        /// Any other provider failure.
        Api { message: String } =>
            "cluster api failure: {message}",
    }
}

/// Port for creating, observing, and deleting the analytic cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Issue a single cluster-creation request.
    async fn create_cluster(
        &self,
        spec: &ClusterSpec,
    ) -> Result<ClusterDescriptor, ClusterApiError>;

    /// Fetch the current provider view of the cluster.
    ///
    /// Returns `None` when the provider no longer knows the identifier;
    /// callers map that to [`ClusterStatus::Absent`].
    ///
    /// [`ClusterStatus::Absent`]: crate::domain::cluster::ClusterStatus::Absent
    async fn describe_cluster(
        &self,
        identifier: &str,
    ) -> Result<Option<ClusterDescriptor>, ClusterApiError>;

    /// Delete the cluster, optionally skipping the final snapshot.
    async fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> Result<(), ClusterApiError>;
}
