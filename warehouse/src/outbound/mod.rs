//! Driven adapters binding the domain ports to real providers.

pub mod aws;
pub mod postgres;

pub use aws::{
    AccessKeyPair, AwsClients, ClientFactoryError, Ec2NetworkApi, IamIdentityApi,
    RedshiftClusterApi, S3ObjectStore,
};
pub use postgres::{PgSession, PgSessionConfig};
