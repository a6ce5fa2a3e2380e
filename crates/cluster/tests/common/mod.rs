//! Test harness for coordinator integration tests.
//!
//! Wraps a [`Cluster`] with the mock backend and a recording listener so tests
//! can register handles, publish topologies and inspect events.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tessera_cluster::{
    Cluster, ClusterId, ClusterSettings, ClusterType, ConnectionMode, NodeDescription, NodeRole,
    Result, SelectedNode, ServerAddress, TopologySnapshot,
    mock::{MockBackend, MockNodeFactory, RecordingListener},
};
use tessera_test_utils::TestClusterTimings;

/// Generous bound for results that should arrive promptly.
pub const PROMPT: Duration = Duration::from_secs(1);

/// A cluster plus handles on its collaborators.
pub struct TestCluster {
    pub cluster: Cluster,
    pub backend: Arc<MockBackend>,
    pub listener: Arc<RecordingListener>,
}

impl TestCluster {
    /// Creates a cluster with the given timings.
    pub fn new(timings: TestClusterTimings) -> Self {
        let backend = Arc::new(MockBackend::new());
        let listener = Arc::new(RecordingListener::new());
        let settings = ClusterSettings::builder()
            .with_config(timings.into_config().expect("valid test timings"))
            .with_listener(listener.clone())
            .build()
            .expect("valid settings");
        let cluster = Cluster::new(
            ClusterId::new("integration"),
            settings,
            backend.clone(),
            Arc::new(MockNodeFactory::new()),
        );
        Self { cluster, backend, listener }
    }

    /// Cluster with short default test timings.
    pub fn fast() -> Self {
        Self::new(TestClusterTimings::builder().build())
    }

    /// Cluster that never times out and re-checks only every ten seconds, so
    /// anything resolved promptly was woken by a topology change.
    pub fn slow_heartbeat() -> Self {
        Self::new(
            TestClusterTimings::builder()
                .wait_forever(true)
                .min_heartbeat_interval(Duration::from_secs(10))
                .build(),
        )
    }

    /// Registers handles for every node and publishes them as a replica set.
    pub fn publish_registered(&self, nodes: Vec<NodeDescription>) {
        for node in &nodes {
            self.backend.register(&node.address);
        }
        self.cluster.publish_topology(replica_set(nodes));
    }
}

pub fn addr(host: &str) -> ServerAddress {
    ServerAddress::tcp(host, 27017)
}

pub fn primary(host: &str) -> NodeDescription {
    NodeDescription::connected(addr(host), NodeRole::Primary)
}

pub fn secondary(host: &str) -> NodeDescription {
    NodeDescription::connected(addr(host), NodeRole::Secondary)
}

pub fn replica_set(nodes: Vec<NodeDescription>) -> TopologySnapshot {
    TopologySnapshot::new(ConnectionMode::Multiple, ClusterType::ReplicaSet, nodes)
}

/// Collects queued selection results.
#[derive(Clone, Default)]
pub struct Results(Arc<Mutex<Vec<Result<SelectedNode>>>>);

impl Results {
    pub fn callback(&self) -> impl FnOnce(Result<SelectedNode>) + Send + 'static {
        let sink = self.0.clone();
        move |result| sink.lock().unwrap().push(result)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn take(&self) -> Vec<Result<SelectedNode>> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}
