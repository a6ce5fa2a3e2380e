//! Test configuration helpers.
//!
//! Production defaults wait 30 seconds for a node and heartbeat every 500ms.
//! Tests want failures in well under a second, so these helpers centralize
//! short timings instead of scattering them across test modules.

use std::time::Duration;

use tessera_types::config::{ClusterConfig, ConfigError, RankingStage};

/// Cluster timings for tests.
#[derive(Debug, Clone, bon::Builder)]
pub struct TestClusterTimings {
    /// Selection deadline.
    #[builder(default = Duration::from_secs(2))]
    pub server_selection_timeout: Duration,
    /// Ignore the deadline and wait until a node matches.
    #[builder(default)]
    pub wait_forever: bool,
    /// Upper bound on a single wait between passes.
    #[builder(default = Duration::from_millis(20))]
    pub min_heartbeat_interval: Duration,
    /// Ranking stages after the mandatory pipeline stages.
    #[builder(default)]
    pub ranking_stages: Vec<RankingStage>,
}

impl TestClusterTimings {
    /// Builds the validated cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the timings are invalid, such
    /// as a zero heartbeat interval.
    pub fn into_config(self) -> Result<ClusterConfig, ConfigError> {
        ClusterConfig::builder()
            .server_selection_timeout(self.server_selection_timeout)
            .wait_forever(self.wait_forever)
            .min_heartbeat_interval(self.min_heartbeat_interval)
            .ranking_stages(self.ranking_stages)
            .build()
    }
}

/// Returns a cluster configuration suitable for tests.
///
/// - `server_selection_timeout`: 2s (long enough for scheduling noise)
/// - `min_heartbeat_interval`: 20ms (fast re-checks)
/// - `ranking_stages`: none (deterministic selection)
#[must_use]
pub fn test_cluster_config() -> ClusterConfig {
    ClusterConfig {
        server_selection_timeout: Some(Duration::from_secs(2)),
        min_heartbeat_interval: Duration::from_millis(20),
        ranking_stages: Vec::new(),
        ..ClusterConfig::default()
    }
}
