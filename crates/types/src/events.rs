//! Structural comparison of topology snapshots for change events.
//!
//! Monitoring republishes the topology after every heartbeat even when nothing
//! a listener cares about changed. Round-trip time drifts on every heartbeat and
//! is therefore excluded from the comparison.

use crate::{node::NodeDescription, topology::TopologySnapshot};

/// Returns whether publishing `next` after `previous` would produce an event
/// indistinguishable from having published nothing.
#[must_use]
pub fn would_generate_equivalent_events(
    previous: &TopologySnapshot,
    next: &TopologySnapshot,
) -> bool {
    if previous.cluster_type != next.cluster_type || previous.nodes.len() != next.nodes.len() {
        return false;
    }
    // Both directions: with a repeated address, equal counts do not imply
    // equal membership.
    covers(previous, next) && covers(next, previous)
}

/// Every node of `from` has an equivalent node at the same address in `to`.
fn covers(to: &TopologySnapshot, from: &TopologySnapshot) -> bool {
    from.nodes.iter().all(|node| match to.node(&node.address) {
        Some(other) => equivalent_nodes(other, node),
        None => false,
    })
}

fn equivalent_nodes(a: &NodeDescription, b: &NodeDescription) -> bool {
    a.address == b.address
        && a.role == b.role
        && a.state == b.state
        && a.ok == b.ok
        && a.min_wire_version == b.min_wire_version
        && a.max_wire_version == b.max_wire_version
        && a.error == b.error
}
