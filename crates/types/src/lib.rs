//! Topology value types and cluster configuration for the Tessera client.
//!
//! This crate provides the immutable values the cluster coordinator publishes
//! and selects from:
//! - Node addresses and descriptions, including wire-version compatibility
//! - Topology snapshots and the structural comparison used to suppress
//!   duplicate change events
//! - Cluster configuration loaded from TOML

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod config;
pub mod events;
pub mod node;
pub mod topology;

// Re-export commonly used types at crate root
pub use address::{AddressParseError, DEFAULT_PORT, ServerAddress};
pub use events::would_generate_equivalent_events;
pub use node::{
    MIN_SUPPORTED_SERVER_RELEASE, NodeDescription, NodeRole, NodeState, SUPPORTED_WIRE_VERSIONS,
    WireVersionRange,
};
pub use topology::{ClusterType, ConnectionMode, TopologySnapshot};
