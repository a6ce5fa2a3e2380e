use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use super::{ConfigError, ParseSnafu};
use crate::topology::ConnectionMode;

/// Default time to wait for a suitable node.
pub const DEFAULT_SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on a single wait between selection attempts.
pub const DEFAULT_MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Default width of the acceptable latency window.
pub const DEFAULT_LOCAL_THRESHOLD: Duration = Duration::from_millis(15);

fn default_server_selection_timeout() -> Option<Duration> {
    Some(DEFAULT_SERVER_SELECTION_TIMEOUT)
}

fn default_min_heartbeat_interval() -> Duration {
    DEFAULT_MIN_HEARTBEAT_INTERVAL
}

fn default_local_threshold() -> Duration {
    DEFAULT_LOCAL_THRESHOLD
}

fn default_ranking_stages() -> Vec<RankingStage> {
    vec![
        RankingStage::Custom,
        RankingStage::LatencyWindow,
        RankingStage::AtMostTwoRandom,
        RankingStage::LeastLoaded,
    ]
}

/// Optional selection stage applied after the caller's selector and
/// deprioritization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RankingStage {
    /// The cluster-wide custom selector, skipped when none is configured.
    Custom,
    /// Keep nodes within `local_threshold` of the fastest round-trip time.
    LatencyWindow,
    /// Keep at most two randomly chosen candidates.
    AtMostTwoRandom,
    /// Keep the candidates with the fewest in-flight operations.
    LeastLoaded,
}

/// Node selection configuration.
///
/// # Validation Rules
///
/// - `min_heartbeat_interval` must be > 0
/// - `ranking_stages` must not contain duplicates
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use tessera_types::config::ClusterConfig;
/// let config = ClusterConfig::builder()
///     .server_selection_timeout(Duration::from_secs(5))
///     .local_threshold(Duration::from_millis(20))
///     .build()
///     .expect("valid cluster config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterConfig {
    /// How the client connects to the deployment.
    #[serde(default)]
    pub mode: ConnectionMode,
    /// How long a selection waits for a suitable node. `None` waits forever.
    ///
    /// Written as a humantime string, or `"infinite"`.
    #[serde(default = "default_server_selection_timeout")]
    #[serde(with = "super::humantime_or_infinite")]
    #[schemars(with = "String")]
    pub server_selection_timeout: Option<Duration>,
    /// Longest single wait between two selection attempts.
    ///
    /// Must be > 0.
    #[serde(default = "default_min_heartbeat_interval")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub min_heartbeat_interval: Duration,
    /// Width of the latency window above the fastest node.
    #[serde(default = "default_local_threshold")]
    #[serde(with = "super::humantime_serde")]
    #[schemars(with = "String")]
    pub local_threshold: Duration,
    /// Ordered optional stages of the selection pipeline.
    ///
    /// Must not contain duplicates.
    #[serde(default = "default_ranking_stages")]
    pub ranking_stages: Vec<RankingStage>,
}

#[bon::bon]
impl ClusterConfig {
    /// Creates a new cluster configuration with validation.
    ///
    /// Setting `wait_forever` overrides `server_selection_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if:
    /// - `min_heartbeat_interval` is zero
    /// - `ranking_stages` contains a stage twice
    #[builder]
    pub fn new(
        #[builder(default)] mode: ConnectionMode,
        #[builder(default = DEFAULT_SERVER_SELECTION_TIMEOUT)] server_selection_timeout: Duration,
        #[builder(default)] wait_forever: bool,
        #[builder(default = default_min_heartbeat_interval())] min_heartbeat_interval: Duration,
        #[builder(default = default_local_threshold())] local_threshold: Duration,
        #[builder(default = default_ranking_stages())] ranking_stages: Vec<RankingStage>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            mode,
            server_selection_timeout: (!wait_forever).then_some(server_selection_timeout),
            min_heartbeat_interval,
            local_threshold,
            ranking_stages,
        };
        config.validate()?;
        Ok(config)
    }
}

impl ClusterConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_heartbeat_interval.is_zero() {
            return Err(ConfigError::Validation {
                message: "min_heartbeat_interval must be > 0".to_string(),
            });
        }
        for (i, stage) in self.ranking_stages.iter().enumerate() {
            if self.ranking_stages[..i].contains(stage) {
                return Err(ConfigError::Validation {
                    message: format!("ranking stage {stage:?} listed more than once"),
                });
            }
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input and
    /// [`ConfigError::Validation`] for out-of-range values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).context(ParseSnafu)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::default(),
            server_selection_timeout: default_server_selection_timeout(),
            min_heartbeat_interval: default_min_heartbeat_interval(),
            local_threshold: default_local_threshold(),
            ranking_stages: default_ranking_stages(),
        }
    }
}
