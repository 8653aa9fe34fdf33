//! Runtime settings loaded via OrthoConfig.
//!
//! Every value can come from the environment (prefix `WAREHOUSE_`) or a
//! configuration file; nothing is read at import time and no process-wide
//! state exists. Optional fields fall back to the reference deployment's
//! defaults through accessors; values with no sensible default (the master
//! password, the database host, the source locations) are surfaced as
//! [`SettingsError::Missing`] when a caller needs them.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::cluster::{ClusterKind, ClusterSpec, MasterCredentials, MasterPassword};
use crate::domain::provision::{RoleSpec, STORAGE_READ_POLICY_ARN};
use crate::domain::source::{SourceLocation, SourceLocationError};

const DEFAULT_CLUSTER_IDENTIFIER: &str = "analytics-warehouse";
const DEFAULT_NODE_TYPE: &str = "dc2.large";
const DEFAULT_NUMBER_OF_NODES: u16 = 4;
const DEFAULT_DB_NAME: &str = "analytics";
const DEFAULT_DB_USER: &str = "awsuser";
const DEFAULT_DB_PORT: u16 = 5439;
const DEFAULT_REGION: &str = "us-west-2";
const DEFAULT_ROLE_NAME: &str = "warehouse-storage-read";

/// Errors raised when a required or malformed setting is consumed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The setting was not provided anywhere.
    #[error("missing configuration value: set {key}")]
    Missing {
        /// Environment variable naming the setting.
        key: &'static str,
    },
    /// The setting was provided but failed validation.
    #[error("invalid configuration value for {key}: {source}")]
    InvalidSource {
        /// Environment variable naming the setting.
        key: &'static str,
        /// Validation failure.
        #[source]
        source: SourceLocationError,
    },
}

/// Configuration surface for the warehouse orchestration binaries.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WAREHOUSE")]
pub struct WarehouseSettings {
    /// Cluster identifier, unique within the account and region.
    pub cluster_identifier: Option<String>,
    /// Cluster topology (`single-node` or `multi-node`).
    pub cluster_type: Option<ClusterKind>,
    /// Compute node hardware class.
    pub node_type: Option<String>,
    /// Number of compute nodes for multi-node clusters.
    pub number_of_nodes: Option<u16>,
    /// Database created alongside the cluster.
    pub db_name: Option<String>,
    /// Master account user name.
    pub db_user: Option<String>,
    /// Master account password. Required for launch and database access.
    pub db_password: Option<String>,
    /// Port the database listens on.
    pub db_port: Option<u16>,
    /// Cluster endpoint host, known once the cluster is available.
    pub db_host: Option<String>,
    /// Identity role name for object-storage reads.
    pub role_name: Option<String>,
    /// Managed policy attached to the role.
    pub role_policy_arn: Option<String>,
    /// Resolved role ARN, printed by the launch binary.
    pub role_arn: Option<String>,
    /// Provider region.
    pub region: Option<String>,
    /// Events source location (`s3://...`).
    pub events_source: Option<String>,
    /// JSONPaths document mapping event fields to staging columns.
    pub events_jsonpaths: Option<String>,
    /// Songs source location (`s3://...`).
    pub songs_source: Option<String>,
}

impl WarehouseSettings {
    /// Load settings from the environment and configuration files only,
    /// skipping command-line arguments (the binaries own their own CLIs).
    ///
    /// # Errors
    ///
    /// Propagates the loader's parse and validation failures.
    pub fn from_env() -> Result<Self, ortho_config::OrthoError> {
        Self::load_from_iter([OsString::from("warehouse")])
    }

    /// Cluster identifier, defaulting to the reference deployment's name.
    #[must_use]
    pub fn cluster_identifier(&self) -> &str {
        self.cluster_identifier
            .as_deref()
            .unwrap_or(DEFAULT_CLUSTER_IDENTIFIER)
    }

    /// Cluster topology, defaulting to multi-node.
    #[must_use]
    pub fn cluster_kind(&self) -> ClusterKind {
        self.cluster_type.unwrap_or(ClusterKind::MultiNode)
    }

    /// Node hardware class.
    #[must_use]
    pub fn node_type(&self) -> &str {
        self.node_type.as_deref().unwrap_or(DEFAULT_NODE_TYPE)
    }

    /// Compute node count.
    #[must_use]
    pub fn number_of_nodes(&self) -> u16 {
        self.number_of_nodes.unwrap_or(DEFAULT_NUMBER_OF_NODES)
    }

    /// Database name.
    #[must_use]
    pub fn db_name(&self) -> &str {
        self.db_name.as_deref().unwrap_or(DEFAULT_DB_NAME)
    }

    /// Master user name.
    #[must_use]
    pub fn db_user(&self) -> &str {
        self.db_user.as_deref().unwrap_or(DEFAULT_DB_USER)
    }

    /// Database port.
    #[must_use]
    pub fn db_port(&self) -> u16 {
        self.db_port.unwrap_or(DEFAULT_DB_PORT)
    }

    /// Provider region.
    #[must_use]
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Role name for object-storage reads.
    #[must_use]
    pub fn role_name(&self) -> &str {
        self.role_name.as_deref().unwrap_or(DEFAULT_ROLE_NAME)
    }

    /// Role spec combining the configured name and policy.
    #[must_use]
    pub fn role_spec(&self) -> RoleSpec {
        RoleSpec {
            name: self.role_name().to_owned(),
            policy_arn: self
                .role_policy_arn
                .clone()
                .unwrap_or_else(|| STORAGE_READ_POLICY_ARN.to_owned()),
        }
    }

    /// Master password.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset.
    pub fn db_password(&self) -> Result<&str, SettingsError> {
        self.db_password
            .as_deref()
            .ok_or(SettingsError::Missing {
                key: "WAREHOUSE_DB_PASSWORD",
            })
    }

    /// Cluster endpoint host.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset.
    pub fn db_host(&self) -> Result<&str, SettingsError> {
        self.db_host.as_deref().ok_or(SettingsError::Missing {
            key: "WAREHOUSE_DB_HOST",
        })
    }

    /// Resolved role ARN for bulk-load credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset.
    pub fn role_arn(&self) -> Result<&str, SettingsError> {
        self.role_arn.as_deref().ok_or(SettingsError::Missing {
            key: "WAREHOUSE_ROLE_ARN",
        })
    }

    /// Events source location.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset and
    /// [`SettingsError::InvalidSource`] when not an S3 URL.
    pub fn events_source(&self) -> Result<SourceLocation, SettingsError> {
        parse_source(self.events_source.as_deref(), "WAREHOUSE_EVENTS_SOURCE")
    }

    /// JSONPaths document location for the events load.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset and
    /// [`SettingsError::InvalidSource`] when not an S3 URL.
    pub fn events_jsonpaths(&self) -> Result<SourceLocation, SettingsError> {
        parse_source(
            self.events_jsonpaths.as_deref(),
            "WAREHOUSE_EVENTS_JSONPATHS",
        )
    }

    /// Songs source location.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset and
    /// [`SettingsError::InvalidSource`] when not an S3 URL.
    pub fn songs_source(&self) -> Result<SourceLocation, SettingsError> {
        parse_source(self.songs_source.as_deref(), "WAREHOUSE_SONGS_SOURCE")
    }

    /// Build the cluster spec for the launch path.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when the master password is unset.
    pub fn cluster_spec(&self, role_arn: &str) -> Result<ClusterSpec, SettingsError> {
        Ok(ClusterSpec {
            identifier: self.cluster_identifier().to_owned(),
            kind: self.cluster_kind(),
            node_type: self.node_type().to_owned(),
            number_of_nodes: self.number_of_nodes(),
            db_name: self.db_name().to_owned(),
            master: MasterCredentials {
                username: self.db_user().to_owned(),
                password: MasterPassword::new(self.db_password()?),
            },
            role_arn: role_arn.to_owned(),
        })
    }
}

fn parse_source(
    value: Option<&str>,
    key: &'static str,
) -> Result<SourceLocation, SettingsError> {
    let raw = value.ok_or(SettingsError::Missing { key })?;
    SourceLocation::parse(raw).map_err(|source| SettingsError::InvalidSource { key, source })
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings loading and accessors.

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    fn load_clean() -> WarehouseSettings {
        WarehouseSettings::from_env().expect("settings should load")
    }

    #[rstest]
    fn default_values_mirror_the_reference_deployment() {
        let _guard = lock_env([
            ("WAREHOUSE_CLUSTER_IDENTIFIER", None::<String>),
            ("WAREHOUSE_CLUSTER_TYPE", None),
            ("WAREHOUSE_NODE_TYPE", None),
            ("WAREHOUSE_NUMBER_OF_NODES", None),
            ("WAREHOUSE_DB_NAME", None),
            ("WAREHOUSE_DB_USER", None),
            ("WAREHOUSE_DB_PORT", None),
            ("WAREHOUSE_REGION", None),
            ("WAREHOUSE_ROLE_NAME", None),
        ]);

        let settings = load_clean();
        assert_eq!(settings.cluster_identifier(), "analytics-warehouse");
        assert_eq!(settings.cluster_kind(), ClusterKind::MultiNode);
        assert_eq!(settings.node_type(), "dc2.large");
        assert_eq!(settings.number_of_nodes(), 4);
        assert_eq!(settings.db_name(), "analytics");
        assert_eq!(settings.db_user(), "awsuser");
        assert_eq!(settings.db_port(), 5439);
        assert_eq!(settings.region(), "us-west-2");
        assert_eq!(settings.role_spec().policy_arn, STORAGE_READ_POLICY_ARN);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("WAREHOUSE_CLUSTER_IDENTIFIER", Some("nightly".to_owned())),
            ("WAREHOUSE_CLUSTER_TYPE", Some("single-node".to_owned())),
            ("WAREHOUSE_NUMBER_OF_NODES", Some("1".to_owned())),
            ("WAREHOUSE_DB_PORT", Some("5555".to_owned())),
            (
                "WAREHOUSE_EVENTS_SOURCE",
                Some("s3://data-lake/events".to_owned()),
            ),
        ]);

        let settings = load_clean();
        assert_eq!(settings.cluster_identifier(), "nightly");
        assert_eq!(settings.cluster_kind(), ClusterKind::SingleNode);
        assert_eq!(settings.number_of_nodes(), 1);
        assert_eq!(settings.db_port(), 5555);
        let events = settings.events_source().expect("source should parse");
        assert_eq!(events.bucket(), "data-lake");
    }

    #[rstest]
    fn missing_password_is_reported_with_its_variable_name() {
        let _guard = lock_env([("WAREHOUSE_DB_PASSWORD", None::<String>)]);

        let error = load_clean().db_password().expect_err("must be missing");
        assert_eq!(
            error,
            SettingsError::Missing {
                key: "WAREHOUSE_DB_PASSWORD"
            }
        );
    }

    #[rstest]
    fn non_s3_sources_are_rejected() {
        let _guard = lock_env([(
            "WAREHOUSE_SONGS_SOURCE",
            Some("https://data-lake/songs".to_owned()),
        )]);

        let error = load_clean().songs_source().expect_err("must be invalid");
        assert!(matches!(
            error,
            SettingsError::InvalidSource {
                key: "WAREHOUSE_SONGS_SOURCE",
                ..
            }
        ));
    }

    #[rstest]
    fn cluster_spec_carries_credentials_and_role() {
        let _guard = lock_env([
            ("WAREHOUSE_DB_PASSWORD", Some("hunter2".to_owned())),
            ("WAREHOUSE_DB_USER", Some("admin".to_owned())),
        ]);

        let spec = load_clean()
            .cluster_spec("arn:aws:iam::1:role/storage-read")
            .expect("spec should build");
        assert_eq!(spec.master.username, "admin");
        assert_eq!(spec.master.password.expose(), "hunter2");
        assert_eq!(spec.role_arn, "arn:aws:iam::1:role/storage-read");
        assert!(spec.validate().is_ok());
    }
}
