//! Cluster descriptors and the provisioning state machine vocabulary.
//!
//! A cluster moves through `Requested -> Creating -> Available` while being
//! provisioned and `Available -> Deleting -> Absent` during teardown. Status
//! values are parsed from the provider's status strings; anything the
//! provider reports that is not part of the lifecycle proper is preserved
//! verbatim in [`ClusterStatus::Other`] so operators can see it.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroize;

/// Provider status strings that mean the cluster will never become ready.
const TERMINAL_FAILURE_STATUSES: [&str; 5] = [
    "hardware-failure",
    "incompatible-hsm",
    "incompatible-network",
    "incompatible-parameters",
    "incompatible-restore",
];

/// Hardware topology requested for a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterKind {
    /// One combined leader/compute node.
    SingleNode,
    /// A leader node plus two or more compute nodes.
    MultiNode,
}

impl ClusterKind {
    /// Provider wire value for this topology.
    #[must_use]
    pub fn as_provider_str(self) -> &'static str {
        match self {
            Self::SingleNode => "single-node",
            Self::MultiNode => "multi-node",
        }
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_provider_str())
    }
}

/// Master password wrapper that scrubs its memory on drop and never appears
/// in debug output.
#[derive(Clone)]
pub struct MasterPassword(String);

impl MasterPassword {
    /// Wrap a raw password string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the secret for handing to a provider or connection builder.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl Drop for MasterPassword {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for MasterPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterPassword(***)")
    }
}

/// Master user credentials for the cluster's administrative database account.
#[derive(Debug, Clone)]
pub struct MasterCredentials {
    /// Administrative user name.
    pub username: String,
    /// Administrative password.
    pub password: MasterPassword,
}

/// Everything the provider needs to create a cluster.
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    /// Unique cluster identifier within the account and region.
    pub identifier: String,
    /// Single- or multi-node topology.
    pub kind: ClusterKind,
    /// Compute node hardware class (for example `dc2.large`).
    pub node_type: String,
    /// Number of compute nodes; only meaningful for multi-node clusters.
    pub number_of_nodes: u16,
    /// Database created alongside the cluster.
    pub db_name: String,
    /// Master account credentials.
    pub master: MasterCredentials,
    /// Identity role the cluster assumes for object-storage reads.
    pub role_arn: String,
}

/// Validation failures for [`ClusterSpec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterSpecError {
    /// The identifier is empty or padded with whitespace.
    #[error("cluster identifier must be a non-empty trimmed string")]
    InvalidIdentifier,
    /// Multi-node clusters need at least two compute nodes.
    #[error("multi-node clusters require at least 2 nodes, got {nodes}")]
    TooFewNodes {
        /// Requested node count.
        nodes: u16,
    },
    /// Single-node clusters must not request a node count.
    #[error("single-node clusters must request exactly 1 node, got {nodes}")]
    SingleNodeCount {
        /// Requested node count.
        nodes: u16,
    },
}

impl ClusterSpec {
    /// Check the spec for shapes the provider would reject outright.
    ///
    /// # Errors
    ///
    /// Returns a [`ClusterSpecError`] describing the first malformed field.
    pub fn validate(&self) -> Result<(), ClusterSpecError> {
        if self.identifier.trim().is_empty() || self.identifier.trim() != self.identifier {
            return Err(ClusterSpecError::InvalidIdentifier);
        }
        match self.kind {
            ClusterKind::MultiNode if self.number_of_nodes < 2 => {
                Err(ClusterSpecError::TooFewNodes {
                    nodes: self.number_of_nodes,
                })
            }
            ClusterKind::SingleNode if self.number_of_nodes != 1 => {
                Err(ClusterSpecError::SingleNodeCount {
                    nodes: self.number_of_nodes,
                })
            }
            _ => Ok(()),
        }
    }

    /// Node count to send to the provider; single-node requests omit it.
    #[must_use]
    pub fn provider_node_count(&self) -> Option<u16> {
        match self.kind {
            ClusterKind::SingleNode => None,
            ClusterKind::MultiNode => Some(self.number_of_nodes),
        }
    }
}

/// Observed cluster lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterStatus {
    /// Creation was requested but the provider has not yet reported back.
    Requested,
    /// The provider is building the cluster.
    Creating,
    /// The cluster is ready for connections.
    Available,
    /// The provider is destroying the cluster.
    Deleting,
    /// The provider no longer knows the cluster.
    Absent,
    /// The cluster reached a terminal state it cannot recover from.
    Failed {
        /// Raw provider status string.
        status: String,
    },
    /// A provider state outside the lifecycle proper (maintenance, resize).
    Other {
        /// Raw provider status string.
        status: String,
    },
}

impl ClusterStatus {
    /// Classify a provider status string.
    #[must_use]
    pub fn from_provider(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        if TERMINAL_FAILURE_STATUSES.contains(&normalized.as_str()) {
            return Self::Failed { status: normalized };
        }
        match normalized.as_str() {
            "creating" => Self::Creating,
            "available" => Self::Available,
            "deleting" | "final-snapshot" => Self::Deleting,
            _ => Self::Other { status: normalized },
        }
    }

    /// Whether the cluster can never reach `Available` from this state.
    #[must_use]
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("requested"),
            Self::Creating => f.write_str("creating"),
            Self::Available => f.write_str("available"),
            Self::Deleting => f.write_str("deleting"),
            Self::Absent => f.write_str("absent"),
            Self::Failed { status } | Self::Other { status } => f.write_str(status),
        }
    }
}

/// Network endpoint of an available cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname of the leader node.
    pub host: String,
    /// TCP port the database listens on.
    pub port: u16,
}

/// Snapshot of a cluster as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescriptor {
    /// Cluster identifier.
    pub identifier: String,
    /// Last observed status.
    pub status: ClusterStatus,
    /// Database created with the cluster, when reported.
    pub db_name: Option<String>,
    /// Endpoint, populated once the cluster is available.
    pub endpoint: Option<Endpoint>,
    /// VPC the cluster was placed in, used for network authorization.
    pub vpc_id: Option<String>,
    /// Identity roles attached to the cluster.
    pub role_arns: Vec<String>,
}
