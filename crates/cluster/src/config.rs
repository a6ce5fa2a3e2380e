//! Coordinator settings.
//!
//! [`ClusterSettings`] pairs the serializable [`ClusterConfig`] with the
//! collaborators that cannot come from a config file: the cluster-wide custom
//! selector, the event listener and the metrics sink.

use std::{fmt, sync::Arc, time::Duration};

use tessera_types::config::{ClusterConfig, ConfigError};

use crate::{
    error::{ConfigSnafu, Result, SelectionError},
    listener::{ClusterListener, NoopClusterListener},
    metrics::{SelectionMetrics, default_metrics},
    selector::NodeSelector,
};

/// Settings for one [`Cluster`](crate::Cluster).
#[derive(Clone)]
pub struct ClusterSettings {
    config: ClusterConfig,
    custom_selector: Option<Arc<dyn NodeSelector>>,
    listener: Arc<dyn ClusterListener>,
    metrics: Arc<dyn SelectionMetrics>,
}

impl ClusterSettings {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ClusterSettingsBuilder {
        ClusterSettingsBuilder::default()
    }

    /// Returns the serializable configuration.
    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Returns the selection timeout. `None` waits forever.
    #[must_use]
    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.config.server_selection_timeout
    }

    /// Returns the longest single wait between selection attempts.
    #[must_use]
    pub fn min_heartbeat_interval(&self) -> Duration {
        self.config.min_heartbeat_interval
    }

    /// Returns the latency window width.
    #[must_use]
    pub fn local_threshold(&self) -> Duration {
        self.config.local_threshold
    }

    /// Returns the cluster-wide custom selector, if any.
    #[must_use]
    pub fn custom_selector(&self) -> Option<&Arc<dyn NodeSelector>> {
        self.custom_selector.as_ref()
    }

    /// Returns the event listener.
    #[must_use]
    pub fn listener(&self) -> &Arc<dyn ClusterListener> {
        &self.listener
    }

    /// Returns the metrics sink.
    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn SelectionMetrics> {
        &self.metrics
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            config: ClusterConfig::default(),
            custom_selector: None,
            listener: Arc::new(NoopClusterListener),
            metrics: default_metrics(),
        }
    }
}

impl fmt::Debug for ClusterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterSettings")
            .field("config", &self.config)
            .field("custom_selector", &self.custom_selector.as_ref().map(ToString::to_string))
            .field("listener", &self.listener)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Builder for [`ClusterSettings`].
#[derive(Default)]
pub struct ClusterSettingsBuilder {
    config: Option<ClusterConfig>,
    custom_selector: Option<Arc<dyn NodeSelector>>,
    listener: Option<Arc<dyn ClusterListener>>,
    metrics: Option<Arc<dyn SelectionMetrics>>,
}

impl ClusterSettingsBuilder {
    /// Sets the configuration. Defaults to [`ClusterConfig::default`].
    #[must_use]
    pub fn with_config(mut self, config: ClusterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a selector applied to every selection after the caller's own.
    ///
    /// Where it runs relative to the other ranking stages is controlled by the
    /// position of `custom` in the configured ranking stages.
    #[must_use]
    pub fn with_custom_selector(mut self, selector: Arc<dyn NodeSelector>) -> Self {
        self.custom_selector = Some(selector);
        self
    }

    /// Sets the lifecycle event listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ClusterListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the metrics sink. Defaults to a no-op.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn SelectionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the settings, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::Config`] if the configuration is invalid.
    pub fn build(self) -> Result<ClusterSettings> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(config_error)?;

        Ok(ClusterSettings {
            config,
            custom_selector: self.custom_selector,
            listener: self.listener.unwrap_or_else(|| Arc::new(NoopClusterListener)),
            metrics: self.metrics.unwrap_or_else(default_metrics),
        })
    }

    /// Builds settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::Config`] if the document is malformed or invalid.
    pub fn build_from_toml(self, input: &str) -> Result<ClusterSettings> {
        let config = ClusterConfig::from_toml_str(input).map_err(config_error)?;
        self.with_config(config).build()
    }
}

fn config_error(err: ConfigError) -> SelectionError {
    ConfigSnafu { message: err.to_string() }.build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tessera_types::config::RankingStage;

    use super::*;
    use crate::selector::WritableSelector;

    #[test]
    fn test_defaults() {
        let settings = ClusterSettings::builder().build().unwrap();
        assert_eq!(settings.server_selection_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.min_heartbeat_interval(), Duration::from_millis(500));
        assert!(settings.custom_selector().is_none());
    }

    #[test]
    fn test_custom_selector_is_kept() {
        let settings = ClusterSettings::builder()
            .with_custom_selector(Arc::new(WritableSelector))
            .build()
            .unwrap();
        assert_eq!(settings.custom_selector().unwrap().to_string(), "WritableSelector");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ClusterConfig::default();
        config.min_heartbeat_interval = Duration::ZERO;
        let err = ClusterSettings::builder().with_config(config).build().unwrap_err();
        assert!(matches!(err, SelectionError::Config { .. }));
        assert!(err.to_string().contains("min_heartbeat_interval"));
    }

    #[test]
    fn test_build_from_toml() {
        let settings = ClusterSettings::builder()
            .build_from_toml(
                r#"
                server_selection_timeout = "100ms"
                ranking_stages = ["latency_window"]
                "#,
            )
            .unwrap();
        assert_eq!(settings.server_selection_timeout(), Some(Duration::from_millis(100)));
        assert_eq!(settings.config().ranking_stages, vec![RankingStage::LatencyWindow]);
    }

    #[test]
    fn test_build_from_malformed_toml() {
        let err = ClusterSettings::builder().build_from_toml("ranking_stages = 3").unwrap_err();
        assert!(matches!(err, SelectionError::Config { .. }));
    }
}
