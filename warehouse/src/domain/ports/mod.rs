//! Driven ports at the hexagonal boundary.
//!
//! Each port isolates one external collaborator (identity, cluster
//! management, network, object storage, the warehouse database) behind a
//! trait with typed errors, so orchestration services stay independent from
//! provider SDKs and wire protocols.

mod macros;
pub(crate) use macros::define_port_error;

mod cluster_api;
mod identity_api;
mod network_api;
mod object_store;
mod sql_session;

#[cfg(test)]
pub use cluster_api::MockClusterApi;
pub use cluster_api::{ClusterApi, ClusterApiError};
#[cfg(test)]
pub use identity_api::MockIdentityApi;
pub use identity_api::{IdentityApi, IdentityApiError};
#[cfg(test)]
pub use network_api::MockNetworkApi;
pub use network_api::{NetworkApi, NetworkApiError, SecurityGroupRef};
#[cfg(test)]
pub use object_store::MockObjectStore;
pub use object_store::{ObjectStore, ObjectStoreError};
pub use sql_session::{SqlSession, SqlSessionError, Statement};
