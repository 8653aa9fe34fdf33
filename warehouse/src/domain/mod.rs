//! Domain types and orchestration services.
//!
//! The domain owns the cluster lifecycle state machine, the role
//! provisioner, the schema manager, the ETL pipeline, and the statement
//! catalog. All interaction with cloud providers and the warehouse database
//! goes through the driven ports in [`ports`]; adapters live in
//! [`crate::outbound`].

pub mod cluster;
pub mod lifecycle;
pub mod pipeline;
pub mod ports;
pub mod provision;
pub mod schema;
pub mod source;
pub mod statements;

#[cfg(test)]
pub(crate) mod testing;

pub use self::cluster::{
    ClusterDescriptor, ClusterKind, ClusterSpec, ClusterSpecError, ClusterStatus, Endpoint,
    MasterCredentials, MasterPassword,
};
pub use self::lifecycle::{
    CancelFlag, CleanupOutcome, ClusterLifecycle, IngressOutcome, LifecycleError, PollPolicy,
    TeardownReport,
};
pub use self::pipeline::{EtlPipeline, PipelineError};
pub use self::provision::{
    ProvisionedRole, RoleOutcome, RoleProvisionError, RoleProvisioner, RoleSpec,
    STORAGE_READ_POLICY_ARN, trust_policy_document,
};
pub use self::schema::{SchemaError, SchemaManager};
pub use self::source::{SourceLocation, SourceLocationError};
pub use self::statements::{Dialect, SchemaCatalog, copy_staging_events, copy_staging_songs};
