//! Node descriptions and wire-version compatibility.
//!
//! A [`NodeDescription`] is the immutable, point-in-time view of one node that
//! monitoring published. It never holds a connection; the live resource backing
//! a node is looked up separately by address.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::address::ServerAddress;

/// Inclusive range of wire-protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireVersionRange {
    /// Lowest supported wire version.
    pub min: u32,
    /// Highest supported wire version.
    pub max: u32,
}

impl WireVersionRange {
    /// Creates a range. `min` must not exceed `max`.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Returns whether `version` falls inside the range.
    #[must_use]
    pub fn contains(&self, version: u32) -> bool {
        self.min <= version && version <= self.max
    }
}

impl fmt::Display for WireVersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Wire versions this client build speaks.
pub const SUPPORTED_WIRE_VERSIONS: WireVersionRange = WireVersionRange::new(7, 25);

/// Oldest server release speaking [`SUPPORTED_WIRE_VERSIONS`]`.min`.
pub const MIN_SUPPORTED_SERVER_RELEASE: &str = "4.0";

/// Role a node plays in its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Not yet determined (no successful heartbeat).
    #[default]
    Unknown,
    /// A single node deployment.
    Standalone,
    /// Replica set member accepting writes.
    Primary,
    /// Replica set member serving reads.
    Secondary,
    /// Voting-only replica set member holding no data.
    Arbiter,
    /// Replica set member in some other state (recovering, startup, ...).
    Other,
    /// Member that has not yet joined its replica set.
    Ghost,
    /// Query router in front of a sharded cluster.
    Router,
    /// Load balancer fronting the deployment.
    LoadBalancer,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Standalone => "Standalone",
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
            Self::Arbiter => "Arbiter",
            Self::Other => "Other",
            Self::Ghost => "Ghost",
            Self::Router => "Router",
            Self::LoadBalancer => "LoadBalancer",
        };
        f.write_str(name)
    }
}

/// Connection state as reported by monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Monitoring has not completed a heartbeat yet.
    #[default]
    Connecting,
    /// The last heartbeat succeeded.
    Connected,
}

/// Immutable description of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Node address.
    pub address: ServerAddress,
    /// Role in the cluster.
    #[serde(default)]
    pub role: NodeRole,
    /// Connection state.
    #[serde(default)]
    pub state: NodeState,
    /// Whether the last heartbeat produced a usable response.
    #[serde(default)]
    pub ok: bool,
    /// Lowest wire version the node accepts.
    #[serde(default)]
    pub min_wire_version: u32,
    /// Highest wire version the node accepts.
    #[serde(default)]
    pub max_wire_version: u32,
    /// Smoothed heartbeat round-trip time. Zero when unmeasured.
    #[serde(default)]
    pub round_trip_time: Duration,
    /// Last monitoring error, if any.
    #[serde(default)]
    pub error: Option<String>,
}

impl NodeDescription {
    /// Creates a description for a node monitoring knows nothing about yet.
    #[must_use]
    pub fn unknown(address: ServerAddress) -> Self {
        Self {
            address,
            role: NodeRole::Unknown,
            state: NodeState::Connecting,
            ok: false,
            min_wire_version: 0,
            max_wire_version: 0,
            round_trip_time: Duration::ZERO,
            error: None,
        }
    }

    /// Creates a healthy, connected node speaking the full supported range.
    #[must_use]
    pub fn connected(address: ServerAddress, role: NodeRole) -> Self {
        Self {
            address,
            role,
            state: NodeState::Connected,
            ok: true,
            min_wire_version: SUPPORTED_WIRE_VERSIONS.min,
            max_wire_version: SUPPORTED_WIRE_VERSIONS.max,
            round_trip_time: Duration::ZERO,
            error: None,
        }
    }

    /// Sets the round-trip time.
    #[must_use]
    pub fn with_round_trip_time(mut self, rtt: Duration) -> Self {
        self.round_trip_time = rtt;
        self
    }

    /// Sets the wire-version range the node reports.
    #[must_use]
    pub fn with_wire_versions(mut self, min: u32, max: u32) -> Self {
        self.min_wire_version = min;
        self.max_wire_version = max;
        self
    }

    /// Returns whether writes may be sent to this node.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.ok
            && matches!(
                self.role,
                NodeRole::Primary | NodeRole::Standalone | NodeRole::Router | NodeRole::LoadBalancer
            )
    }

    /// Returns whether reads may be sent to this node.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.is_writable() || (self.ok && self.role == NodeRole::Secondary)
    }

    /// Returns whether the node holds data.
    #[must_use]
    pub fn is_data_bearing(&self) -> bool {
        self.ok
            && matches!(
                self.role,
                NodeRole::Primary | NodeRole::Secondary | NodeRole::Standalone | NodeRole::Router
            )
    }

    /// Returns whether the node only speaks versions older than `supported`.
    ///
    /// Only nodes with a successful heartbeat are judged.
    #[must_use]
    pub fn incompatibly_older_than(&self, supported: &WireVersionRange) -> bool {
        self.ok && self.max_wire_version < supported.min
    }

    /// Returns whether the node only speaks versions newer than `supported`.
    ///
    /// Only nodes with a successful heartbeat are judged.
    #[must_use]
    pub fn incompatibly_newer_than(&self, supported: &WireVersionRange) -> bool {
        self.ok && self.min_wire_version > supported.max
    }

    /// One-line summary used in diagnostics.
    #[must_use]
    pub fn short_description(&self) -> String {
        let mut out = format!("{{address={}, type={}", self.address, self.role);
        if self.ok {
            out.push_str(&format!(
                ", wire=[{}, {}], rtt={}ms",
                self.min_wire_version,
                self.max_wire_version,
                self.round_trip_time.as_millis()
            ));
        } else {
            out.push_str(&format!(", state={:?}", self.state));
        }
        if let Some(ref error) = self.error {
            out.push_str(&format!(", error={error}"));
        }
        out.push('}');
        out
    }
}
