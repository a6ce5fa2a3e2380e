//! Collaborator interfaces for live nodes.
//!
//! The coordinator never owns connections. It asks a [`NodeFactory`] to create
//! the handle for an address, and a [`ClusterBackend`] for the set of handles
//! that currently exist. That set is read independently of the topology
//! snapshot, so the two may disagree for a short while.

use std::{collections::HashMap, fmt, sync::Arc};

use tessera_types::{NodeDescription, ServerAddress};

/// A live, addressable node resource such as a connection pool.
pub trait ClusterableNode: Send + Sync + fmt::Debug {
    /// Address this handle talks to.
    fn address(&self) -> &ServerAddress;

    /// Number of operations currently in flight on this node.
    fn operation_count(&self) -> usize;
}

/// Creates node handles.
pub trait NodeFactory: Send + Sync + fmt::Debug {
    /// Creates the handle for `address`.
    fn create(&self, address: &ServerAddress) -> Arc<dyn ClusterableNode>;
}

/// Monitoring side of the cluster.
pub trait ClusterBackend: Send + Sync + fmt::Debug {
    /// Asks monitoring to refresh its view of the cluster.
    ///
    /// Called whenever selection is blocked. There is no guarantee the refresh
    /// happens immediately, or at all.
    fn connect(&self);

    /// Returns the node handles that currently exist.
    fn nodes_snapshot(&self) -> NodeRegistrySnapshot;
}

/// Point-in-time view of address to node handle.
///
/// Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistrySnapshot {
    nodes: Arc<HashMap<ServerAddress, Arc<dyn ClusterableNode>>>,
}

impl NodeRegistrySnapshot {
    /// Creates a snapshot from node handles, keyed by their addresses.
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = Arc<dyn ClusterableNode>>) -> Self {
        nodes.into_iter().collect()
    }

    /// Returns the handle registered for `address`.
    #[must_use]
    pub fn get(&self, address: &ServerAddress) -> Option<&Arc<dyn ClusterableNode>> {
        self.nodes.get(address)
    }

    /// Returns whether a handle exists for `address`.
    #[must_use]
    pub fn contains(&self, address: &ServerAddress) -> bool {
        self.nodes.contains_key(address)
    }

    /// Number of registered handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether no handle is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<Arc<dyn ClusterableNode>> for NodeRegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ClusterableNode>>>(iter: I) -> Self {
        let nodes = iter.into_iter().map(|node| (node.address().clone(), node)).collect();
        Self { nodes: Arc::new(nodes) }
    }
}

/// The outcome of a successful selection.
#[derive(Debug, Clone)]
pub struct SelectedNode {
    /// Handle to send the operation through.
    pub node: Arc<dyn ClusterableNode>,
    /// Description the node was selected from.
    pub description: NodeDescription,
}

impl SelectedNode {
    /// Address of the selected node.
    #[must_use]
    pub fn address(&self) -> &ServerAddress {
        &self.description.address
    }
}
