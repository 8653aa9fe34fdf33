//! Driven port for read-only object-storage probes.
//!
//! The pipeline itself never reads source files directly (the warehouse
//! engine pulls them during bulk load), but the launch path probes each
//! source location before paying for a cluster.

use async_trait::async_trait;

use crate::domain::source::SourceLocation;

use super::define_port_error;

define_port_error! {
    /// Errors raised by the object-storage service.
    pub enum ObjectStoreError {
        /// The bucket does not exist or is not visible.
        NotFound { message: String } =>
            "object storage location not found: {message}",
        /// The credentials were rejected or lack permission.
        Unauthorized { message: String } =>
            "object storage request unauthorized: {message}",
        /// Any other provider failure.
        Api { message: String } =>
            "object storage api failure: {message}",
    }
}

/// Port for checking that a source location is readable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Count objects under the location, sampling at most one listing page.
    ///
    /// A return of `0` means the location is readable but currently empty.
    async fn probe(&self, location: &SourceLocation) -> Result<u64, ObjectStoreError>;
}
