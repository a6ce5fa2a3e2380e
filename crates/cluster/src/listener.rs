//! Cluster lifecycle events.
//!
//! Events are delivered synchronously, in the order the corresponding state
//! was installed. Listeners must return quickly and must not call back into
//! the cluster that notified them.

use std::{fmt, sync::Arc};

use tessera_types::TopologySnapshot;

use crate::cluster::ClusterId;

/// Emitted once when a cluster is created.
#[derive(Debug, Clone)]
pub struct ClusterOpeningEvent {
    /// Cluster being opened.
    pub cluster_id: ClusterId,
    /// Snapshot installed at construction.
    pub initial: Arc<TopologySnapshot>,
}

/// Emitted when a published snapshot differs observably from its predecessor.
#[derive(Debug, Clone)]
pub struct ClusterDescriptionChangedEvent {
    /// Cluster whose topology changed.
    pub cluster_id: ClusterId,
    /// Snapshot that was replaced.
    pub previous: Arc<TopologySnapshot>,
    /// Snapshot now current.
    pub current: Arc<TopologySnapshot>,
}

/// Emitted once when a cluster is closed.
#[derive(Debug, Clone)]
pub struct ClusterClosedEvent {
    /// Cluster being closed.
    pub cluster_id: ClusterId,
}

/// Receives cluster lifecycle events. All methods default to no-ops.
pub trait ClusterListener: Send + Sync + fmt::Debug {
    /// The cluster was created.
    fn cluster_opening(&self, event: &ClusterOpeningEvent) {
        let _ = event;
    }

    /// The topology changed.
    fn cluster_description_changed(&self, event: &ClusterDescriptionChangedEvent) {
        let _ = event;
    }

    /// The cluster was closed.
    fn cluster_closed(&self, event: &ClusterClosedEvent) {
        let _ = event;
    }
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClusterListener;

impl ClusterListener for NoopClusterListener {}
