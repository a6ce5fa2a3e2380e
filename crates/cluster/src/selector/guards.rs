//! Mandatory pipeline stages.

use std::fmt;

use tessera_types::{NodeDescription, ServerAddress, TopologySnapshot};

use super::NodeSelector;
use crate::node::NodeRegistrySnapshot;

/// Admits only nodes that have a live handle in the registry snapshot.
///
/// The registry is read independently of the topology snapshot, so a node can
/// be described before its handle exists or after it was removed. Such a node
/// must never be returned.
#[derive(Debug, Clone)]
pub struct RegisteredNodes {
    registry: NodeRegistrySnapshot,
}

impl RegisteredNodes {
    /// Creates the stage for one attempt's registry snapshot.
    #[must_use]
    pub fn new(registry: NodeRegistrySnapshot) -> Self {
        Self { registry }
    }
}

impl NodeSelector for RegisteredNodes {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        snapshot.nodes.iter().filter(|n| self.registry.contains(&n.address)).cloned().collect()
    }
}

impl fmt::Display for RegisteredNodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegisteredNodes{{count={}}}", self.registry.len())
    }
}

/// Removes nodes already handed out to the operation, unless that would leave
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct DeprioritizedNodes {
    attempted: Vec<ServerAddress>,
}

impl DeprioritizedNodes {
    /// Creates the stage from the operation's attempted addresses.
    #[must_use]
    pub fn new(attempted: Vec<ServerAddress>) -> Self {
        Self { attempted }
    }
}

impl NodeSelector for DeprioritizedNodes {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        if self.attempted.is_empty() {
            return snapshot.nodes.clone();
        }
        let fresh: Vec<_> = snapshot
            .nodes
            .iter()
            .filter(|n| !self.attempted.contains(&n.address))
            .cloned()
            .collect();
        if fresh.is_empty() { snapshot.nodes.clone() } else { fresh }
    }
}

impl fmt::Display for DeprioritizedNodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeprioritizedNodes{attempted=[")?;
        for (i, address) in self.attempted.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{address}")?;
        }
        f.write_str("]}")
    }
}
