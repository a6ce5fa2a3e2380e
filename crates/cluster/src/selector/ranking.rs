//! Optional ranking stages.
//!
//! These run after the caller's selector and deprioritization, in the order the
//! cluster configuration lists them.

use std::{fmt, time::Duration};

use tessera_types::{NodeDescription, TopologySnapshot};

use super::NodeSelector;
use crate::node::NodeRegistrySnapshot;

/// Keeps nodes whose round-trip time is within `local_threshold` of the
/// fastest node.
///
/// A node without a measurement counts as zero.
#[derive(Debug, Clone, Copy)]
pub struct LatencyWindow {
    local_threshold: Duration,
}

impl LatencyWindow {
    /// Creates the stage.
    #[must_use]
    pub fn new(local_threshold: Duration) -> Self {
        Self { local_threshold }
    }
}

impl NodeSelector for LatencyWindow {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        let Some(fastest) = snapshot.nodes.iter().map(|n| n.round_trip_time).min() else {
            return Vec::new();
        };
        let limit = fastest.saturating_add(self.local_threshold);
        snapshot.nodes.iter().filter(|n| n.round_trip_time <= limit).cloned().collect()
    }
}

impl fmt::Display for LatencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LatencyWindow{{local_threshold={}ms}}", self.local_threshold.as_millis())
    }
}

/// Keeps at most two candidates chosen uniformly at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtMostTwoRandom;

impl NodeSelector for AtMostTwoRandom {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        if snapshot.nodes.len() <= 2 {
            return snapshot.nodes.clone();
        }
        let mut rng = rand::rng();
        rand::seq::index::sample(&mut rng, snapshot.nodes.len(), 2)
            .into_iter()
            .map(|i| snapshot.nodes[i].clone())
            .collect()
    }
}

impl fmt::Display for AtMostTwoRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AtMostTwoRandom")
    }
}

/// Keeps the candidates with the fewest in-flight operations.
///
/// Nodes without a handle in the registry snapshot are dropped.
#[derive(Debug, Clone)]
pub struct LeastLoaded {
    registry: NodeRegistrySnapshot,
}

impl LeastLoaded {
    /// Creates the stage for one attempt's registry snapshot.
    #[must_use]
    pub fn new(registry: NodeRegistrySnapshot) -> Self {
        Self { registry }
    }
}

impl NodeSelector for LeastLoaded {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        let loads: Vec<(usize, &NodeDescription)> = snapshot
            .nodes
            .iter()
            .filter_map(|n| self.registry.get(&n.address).map(|h| (h.operation_count(), n)))
            .collect();
        let Some(min) = loads.iter().map(|(load, _)| *load).min() else {
            return Vec::new();
        };
        loads.into_iter().filter(|(load, _)| *load == min).map(|(_, n)| n.clone()).collect()
    }
}

impl fmt::Display for LeastLoaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LeastLoaded")
    }
}
