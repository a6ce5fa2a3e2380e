//! Caller-facing selectors.

use std::fmt;

use tessera_types::{ClusterType, ConnectionMode, NodeDescription, ServerAddress, TopologySnapshot};

use super::NodeSelector;

/// Returns whether role filtering is bypassed for this snapshot.
///
/// A single-node connection uses whatever it is connected to, and a load
/// balancer hides roles entirely.
fn bypasses_roles(snapshot: &TopologySnapshot) -> bool {
    snapshot.mode == ConnectionMode::Single || snapshot.cluster_type == ClusterType::LoadBalanced
}

/// Admits nodes that accept writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WritableSelector;

impl NodeSelector for WritableSelector {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        if bypasses_roles(snapshot) {
            return snapshot.nodes.iter().filter(|n| n.ok).cloned().collect();
        }
        snapshot.nodes.iter().filter(|n| n.is_writable()).cloned().collect()
    }
}

impl fmt::Display for WritableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WritableSelector")
    }
}

/// Admits nodes that serve reads, primaries included.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadableSelector;

impl NodeSelector for ReadableSelector {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        if bypasses_roles(snapshot) {
            return snapshot.nodes.iter().filter(|n| n.ok).cloned().collect();
        }
        snapshot.nodes.iter().filter(|n| n.is_readable()).cloned().collect()
    }
}

impl fmt::Display for ReadableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadableSelector")
    }
}

/// Admits the node at one address, whatever its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSelector {
    address: ServerAddress,
}

impl AddressSelector {
    /// Creates a selector for `address`.
    #[must_use]
    pub fn new(address: ServerAddress) -> Self {
        Self { address }
    }
}

impl NodeSelector for AddressSelector {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        snapshot.node(&self.address).into_iter().cloned().collect()
    }
}

impl fmt::Display for AddressSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressSelector{{address={}}}", self.address)
    }
}

/// Selector backed by a closure. See [`selector_fn`].
pub struct FnSelector<F> {
    description: String,
    select: F,
}

impl<F> fmt::Debug for FnSelector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSelector").field("description", &self.description).finish_non_exhaustive()
    }
}

impl<F> NodeSelector for FnSelector<F>
where
    F: Fn(&TopologySnapshot) -> Vec<NodeDescription> + Send + Sync,
{
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        (self.select)(snapshot)
    }
}

impl<F> fmt::Display for FnSelector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Wraps a closure as a selector named `description`.
///
/// # Example
///
/// ```
/// use tessera_cluster::selector_fn;
///
/// let fast = selector_fn("fast-secondaries", |snapshot| {
///     snapshot
///         .nodes
///         .iter()
///         .filter(|n| n.round_trip_time.as_millis() < 5)
///         .cloned()
///         .collect()
/// });
/// assert_eq!(fast.to_string(), "fast-secondaries");
/// ```
pub fn selector_fn<F>(description: impl Into<String>, select: F) -> FnSelector<F>
where
    F: Fn(&TopologySnapshot) -> Vec<NodeDescription> + Send + Sync,
{
    FnSelector { description: description.into(), select }
}
