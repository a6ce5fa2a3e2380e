//! In-memory collaborators for testing code built on the coordinator.
//!
//! This module provides controllable implementations of the collaborator
//! traits so a [`Cluster`](crate::Cluster) can be driven without monitoring or
//! connection pools.
//!
//! # Features
//!
//! - **Node registry**: register and deregister live handles independently of
//!   the published topology
//! - **Load injection**: set the in-flight operation count per node
//! - **Refresh counting**: track how often selection asked for a refresh
//! - **Event recording**: capture every lifecycle event in order
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tessera_cluster::mock::{MockBackend, MockNodeFactory};
//! use tessera_cluster::{Cluster, ClusterId, ClusterSettings, OperationContext, WritableSelector};
//! use tessera_types::{ClusterType, ConnectionMode, NodeDescription, NodeRole, ServerAddress, TopologySnapshot};
//!
//! #[tokio::test]
//! async fn test_selects_primary() {
//!     let backend = Arc::new(MockBackend::new());
//!     let cluster = Cluster::new(
//!         ClusterId::new("test"),
//!         ClusterSettings::default(),
//!         backend.clone(),
//!         Arc::new(MockNodeFactory::new()),
//!     );
//!
//!     let primary = ServerAddress::tcp("db1", 27017);
//!     backend.register(&primary);
//!     cluster.publish_topology(TopologySnapshot::new(
//!         ConnectionMode::Multiple,
//!         ClusterType::ReplicaSet,
//!         vec![NodeDescription::connected(primary.clone(), NodeRole::Primary)],
//!     ));
//!
//!     let selected = cluster.select_node(&WritableSelector, &OperationContext::new()).await.unwrap();
//!     assert_eq!(selected.address(), &primary);
//! }
//! ```

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::{Mutex, RwLock};
use tessera_types::ServerAddress;

use crate::{
    listener::{
        ClusterClosedEvent, ClusterDescriptionChangedEvent, ClusterListener, ClusterOpeningEvent,
    },
    node::{ClusterBackend, ClusterableNode, NodeFactory, NodeRegistrySnapshot},
};

/// Node handle with a settable in-flight operation count.
#[derive(Debug)]
pub struct MockNode {
    address: ServerAddress,
    operations: AtomicUsize,
}

impl MockNode {
    /// Creates an idle handle for `address`.
    #[must_use]
    pub fn new(address: ServerAddress) -> Self {
        Self { address, operations: AtomicUsize::new(0) }
    }

    /// Sets the number of operations reported as in flight.
    pub fn set_operation_count(&self, count: usize) {
        self.operations.store(count, Ordering::Relaxed);
    }
}

impl ClusterableNode for MockNode {
    fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn operation_count(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }
}

/// Factory that creates [`MockNode`]s and remembers what it created.
#[derive(Debug, Default)]
pub struct MockNodeFactory {
    created: Mutex<Vec<ServerAddress>>,
}

impl MockNodeFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses passed to [`NodeFactory::create`], in call order.
    #[must_use]
    pub fn created(&self) -> Vec<ServerAddress> {
        self.created.lock().clone()
    }
}

impl NodeFactory for MockNodeFactory {
    fn create(&self, address: &ServerAddress) -> Arc<dyn ClusterableNode> {
        self.created.lock().push(address.clone());
        Arc::new(MockNode::new(address.clone()))
    }
}

/// Backend with a hand-managed node registry.
#[derive(Debug, Default)]
pub struct MockBackend {
    nodes: RwLock<HashMap<ServerAddress, Arc<MockNode>>>,
    connects: AtomicUsize,
}

impl MockBackend {
    /// Creates a backend with no registered nodes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle for `address`, replacing any existing one.
    pub fn register(&self, address: &ServerAddress) -> Arc<MockNode> {
        let node = Arc::new(MockNode::new(address.clone()));
        self.nodes.write().insert(address.clone(), Arc::clone(&node));
        node
    }

    /// Removes the handle for `address`.
    pub fn deregister(&self, address: &ServerAddress) {
        self.nodes.write().remove(address);
    }

    /// Returns the handle registered for `address`.
    #[must_use]
    pub fn node(&self, address: &ServerAddress) -> Option<Arc<MockNode>> {
        self.nodes.read().get(address).cloned()
    }

    /// Number of refresh requests received.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

impl ClusterBackend for MockBackend {
    fn connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    fn nodes_snapshot(&self) -> NodeRegistrySnapshot {
        self.nodes
            .read()
            .values()
            .map(|node| Arc::clone(node) as Arc<dyn ClusterableNode>)
            .collect()
    }
}

/// An event captured by [`RecordingListener`].
#[derive(Debug, Clone)]
pub enum RecordedEvent {
    /// Cluster opened.
    Opening(ClusterOpeningEvent),
    /// Topology changed.
    Changed(ClusterDescriptionChangedEvent),
    /// Cluster closed.
    Closed(ClusterClosedEvent),
}

/// Listener that records every event in delivery order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingListener {
    /// Creates a listener with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Number of opening events.
    #[must_use]
    pub fn opening_count(&self) -> usize {
        self.count(|e| matches!(e, RecordedEvent::Opening(_)))
    }

    /// Number of description-changed events.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.count(|e| matches!(e, RecordedEvent::Changed(_)))
    }

    /// Number of closed events.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.count(|e| matches!(e, RecordedEvent::Closed(_)))
    }

    fn count(&self, predicate: impl Fn(&RecordedEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl ClusterListener for RecordingListener {
    fn cluster_opening(&self, event: &ClusterOpeningEvent) {
        self.events.lock().push(RecordedEvent::Opening(event.clone()));
    }

    fn cluster_description_changed(&self, event: &ClusterDescriptionChangedEvent) {
        self.events.lock().push(RecordedEvent::Changed(event.clone()));
    }

    fn cluster_closed(&self, event: &ClusterClosedEvent) {
        self.events.lock().push(RecordedEvent::Closed(event.clone()));
    }
}
