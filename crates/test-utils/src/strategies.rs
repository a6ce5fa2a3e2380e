//! Proptest strategies for Tessera topology types.
//!
//! Reusable generators for property-based testing across crates. Strategies
//! produce well-formed topology values while exploring roles, health, wire
//! ranges and latencies through random variation.
//!
//! # Usage
//!
//! ```no_run
//! use proptest::prelude::*;
//! use tessera_test_utils::strategies;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(snapshot in strategies::arb_topology_snapshot()) {
//!         // test invariant with a randomly generated topology
//!     }
//! }
//! ```

use std::{collections::HashSet, time::Duration};

use proptest::prelude::*;
use tessera_types::{
    ClusterType, ConnectionMode, NodeDescription, NodeRole, NodeState, SUPPORTED_WIRE_VERSIONS,
    ServerAddress, TopologySnapshot,
};

/// Generates a TCP address with a short lowercase host and a non-zero port.
pub fn arb_tcp_address() -> impl Strategy<Value = ServerAddress> {
    ("[a-z][a-z0-9]{0,7}", 1u16..=u16::MAX).prop_map(|(host, port)| ServerAddress::tcp(host, port))
}

/// Generates a TCP address, or occasionally a Unix-domain socket path.
pub fn arb_server_address() -> impl Strategy<Value = ServerAddress> {
    prop_oneof![
        9 => arb_tcp_address(),
        1 => "[a-z]{1,8}".prop_map(|name| ServerAddress::unix(format!("/tmp/{name}.sock"))),
    ]
}

/// Generates any node role.
pub fn arb_node_role() -> impl Strategy<Value = NodeRole> {
    prop::sample::select(vec![
        NodeRole::Unknown,
        NodeRole::Standalone,
        NodeRole::Primary,
        NodeRole::Secondary,
        NodeRole::Arbiter,
        NodeRole::Other,
        NodeRole::Ghost,
        NodeRole::Router,
        NodeRole::LoadBalancer,
    ])
}

/// Generates a round-trip time between 0 and 500ms.
pub fn arb_round_trip_time() -> impl Strategy<Value = Duration> {
    (0u64..500).prop_map(Duration::from_millis)
}

/// Generates a healthy node inside the supported wire-version range.
pub fn arb_compatible_node_description() -> impl Strategy<Value = NodeDescription> {
    (arb_server_address(), arb_node_role(), arb_round_trip_time()).prop_map(
        |(address, role, rtt)| NodeDescription::connected(address, role).with_round_trip_time(rtt),
    )
}

/// Generates a node with arbitrary health and wire range.
///
/// Wire ranges are well-formed (`min <= max`) and straddle the supported range
/// so that too-old and too-new nodes both occur.
pub fn arb_node_description() -> impl Strategy<Value = NodeDescription> {
    let span = SUPPORTED_WIRE_VERSIONS.max + 8;
    (
        arb_server_address(),
        arb_node_role(),
        any::<bool>(),
        0..span,
        0..span,
        arb_round_trip_time(),
    )
        .prop_map(|(address, role, ok, a, b, rtt)| NodeDescription {
            address,
            role,
            state: if ok { NodeState::Connected } else { NodeState::Connecting },
            ok,
            min_wire_version: a.min(b),
            max_wire_version: a.max(b),
            round_trip_time: rtt,
            error: (!ok).then(|| "connection refused".to_string()),
        })
}

/// Generates any cluster type.
pub fn arb_cluster_type() -> impl Strategy<Value = ClusterType> {
    prop::sample::select(vec![
        ClusterType::Unknown,
        ClusterType::Standalone,
        ClusterType::ReplicaSet,
        ClusterType::Sharded,
        ClusterType::LoadBalanced,
    ])
}

/// Generates a compatible multi-node snapshot of 0-7 nodes with distinct
/// addresses.
pub fn arb_topology_snapshot() -> impl Strategy<Value = TopologySnapshot> {
    (arb_cluster_type(), proptest::collection::vec(arb_compatible_node_description(), 0..8))
        .prop_map(|(cluster_type, nodes)| {
            TopologySnapshot::new(ConnectionMode::Multiple, cluster_type, distinct(nodes))
        })
}

/// Generates a snapshot of 0-7 nodes with distinct addresses and arbitrary
/// health and wire ranges, compatible or not.
pub fn arb_any_topology_snapshot() -> impl Strategy<Value = TopologySnapshot> {
    (arb_cluster_type(), proptest::collection::vec(arb_node_description(), 0..8)).prop_map(
        |(cluster_type, nodes)| {
            TopologySnapshot::new(ConnectionMode::Multiple, cluster_type, distinct(nodes))
        },
    )
}

fn distinct(nodes: Vec<NodeDescription>) -> Vec<NodeDescription> {
    let mut seen = HashSet::new();
    nodes.into_iter().filter(|node| seen.insert(node.address.clone())).collect()
}
