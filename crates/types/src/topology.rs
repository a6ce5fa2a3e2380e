//! Immutable topology snapshots.
//!
//! The coordinator publishes a new [`TopologySnapshot`] every time monitoring
//! learns something about the cluster. Snapshots are never mutated in place;
//! selection narrows them into candidate sets with [`TopologySnapshot::with_nodes`].

// The schemars `JsonSchema` derive macro internally uses `.unwrap()` in its
// expansions.
#![allow(clippy::disallowed_methods)]

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    address::ServerAddress,
    node::{NodeDescription, SUPPORTED_WIRE_VERSIONS, WireVersionRange},
};

/// How the client connects to the deployment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// Talk to exactly one node, whatever its role.
    Single,
    /// Discover and use every member of the deployment.
    #[default]
    Multiple,
    /// Talk to a load balancer fronting the deployment.
    LoadBalanced,
}

/// Kind of deployment, as inferred by monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    /// Not yet known.
    #[default]
    Unknown,
    /// A single standalone node.
    Standalone,
    /// A replica set.
    ReplicaSet,
    /// A sharded cluster reached through routers.
    Sharded,
    /// A deployment behind a load balancer.
    LoadBalanced,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "UNKNOWN",
            Self::Standalone => "STANDALONE",
            Self::ReplicaSet => "REPLICA_SET",
            Self::Sharded => "SHARDED",
            Self::LoadBalanced => "LOAD_BALANCED",
        };
        f.write_str(name)
    }
}

/// Point-in-time description of every known node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Connection mode the client was configured with.
    pub mode: ConnectionMode,
    /// Kind of deployment.
    pub cluster_type: ClusterType,
    /// Known nodes, in monitoring order.
    pub nodes: Vec<NodeDescription>,
    /// Wire versions this client supports.
    pub supported: WireVersionRange,
}

impl TopologySnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(mode: ConnectionMode, cluster_type: ClusterType, nodes: Vec<NodeDescription>) -> Self {
        Self { mode, cluster_type, nodes, supported: SUPPORTED_WIRE_VERSIONS }
    }

    /// Snapshot installed before monitoring has reported anything.
    #[must_use]
    pub fn initial(mode: ConnectionMode) -> Self {
        Self::new(mode, ClusterType::Unknown, Vec::new())
    }

    /// Returns whether every node can be spoken to by this client.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.find_incompatibly_older().is_none() && self.find_incompatibly_newer().is_none()
    }

    /// Returns the first node whose wire versions are all below the supported range.
    #[must_use]
    pub fn find_incompatibly_older(&self) -> Option<&NodeDescription> {
        self.nodes.iter().find(|node| node.incompatibly_older_than(&self.supported))
    }

    /// Returns the first node whose wire versions are all above the supported range.
    #[must_use]
    pub fn find_incompatibly_newer(&self) -> Option<&NodeDescription> {
        self.nodes.iter().find(|node| node.incompatibly_newer_than(&self.supported))
    }

    /// Looks up a node by address.
    #[must_use]
    pub fn node(&self, address: &ServerAddress) -> Option<&NodeDescription> {
        self.nodes.iter().find(|node| &node.address == address)
    }

    /// Returns a copy of this snapshot restricted to `nodes`.
    ///
    /// Cluster-level metadata is preserved so later pipeline stages see the
    /// same deployment kind.
    #[must_use]
    pub fn with_nodes(&self, nodes: Vec<NodeDescription>) -> Self {
        Self { mode: self.mode, cluster_type: self.cluster_type, nodes, supported: self.supported }
    }

    /// Human-readable summary used in timeout messages and log records.
    #[must_use]
    pub fn short_description(&self) -> String {
        let nodes = self
            .nodes
            .iter()
            .map(NodeDescription::short_description)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{type={}, servers=[{nodes}]}}", self.cluster_type)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::node::NodeRole;

    fn node(port: u16, role: NodeRole) -> NodeDescription {
        NodeDescription::connected(ServerAddress::tcp("host", port), role)
    }

    #[test]
    fn test_initial_snapshot_is_empty_and_unknown() {
        let snapshot = TopologySnapshot::initial(ConnectionMode::Multiple);
        assert_eq!(snapshot.cluster_type, ClusterType::Unknown);
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.is_compatible());
        assert_eq!(snapshot.short_description(), "{type=UNKNOWN, servers=[]}");
    }

    #[test]
    fn test_incompatible_node_found() {
        let old = node(1, NodeRole::Primary).with_wire_versions(0, 2);
        let snapshot = TopologySnapshot::new(
            ConnectionMode::Multiple,
            ClusterType::ReplicaSet,
            vec![node(2, NodeRole::Secondary), old.clone()],
        );
        assert!(!snapshot.is_compatible());
        assert_eq!(snapshot.find_incompatibly_older(), Some(&old));
        assert!(snapshot.find_incompatibly_newer().is_none());
    }

    #[test]
    fn test_with_nodes_keeps_metadata() {
        let snapshot = TopologySnapshot::new(
            ConnectionMode::Multiple,
            ClusterType::ReplicaSet,
            vec![node(1, NodeRole::Primary), node(2, NodeRole::Secondary)],
        );
        let narrowed = snapshot.with_nodes(vec![node(2, NodeRole::Secondary)]);
        assert_eq!(narrowed.cluster_type, ClusterType::ReplicaSet);
        assert_eq!(narrowed.nodes.len(), 1);
        assert!(narrowed.node(&ServerAddress::tcp("host", 1)).is_none());
        assert!(narrowed.node(&ServerAddress::tcp("host", 2)).is_some());
    }

    #[test]
    fn test_short_description_lists_nodes() {
        let snapshot = TopologySnapshot::new(
            ConnectionMode::Single,
            ClusterType::Standalone,
            vec![node(9, NodeRole::Standalone)],
        );
        let text = snapshot.short_description();
        assert!(text.starts_with("{type=STANDALONE, servers=[{address=host:9"));
    }
}
