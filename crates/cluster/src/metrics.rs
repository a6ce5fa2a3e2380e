//! Selection metrics.
//!
//! This module provides a pluggable metrics trait ([`SelectionMetrics`]) that
//! callers implement to collect telemetry from the coordinator. Two
//! implementations are included:
//!
//! - [`NoopSelectionMetrics`]: default that discards everything.
//! - [`MetricsSelectionMetrics`]: forwards to the [`metrics`](https://docs.rs/metrics) facade.
//!
//! # Metric Names
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `tessera_selection_total` | Counter | `outcome` | Completed selections by outcome |
//! | `tessera_selection_duration_seconds` | Histogram | `outcome` | Time from request to result |
//! | `tessera_selection_queue_depth` | Gauge | | Queued requests awaiting a node |
//! | `tessera_topology_updates_total` | Counter | | Published topology snapshots |

use std::{fmt, sync::Arc, time::Duration};

/// Trait for coordinator metrics collection.
///
/// All methods have default no-op implementations.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// clone of a cluster and by its dispatcher.
pub trait SelectionMetrics: Send + Sync + fmt::Debug {
    /// Records a completed selection.
    ///
    /// - `outcome`: `"success"` or a [`SelectionError::kind`](crate::SelectionError::kind) label.
    /// - `duration`: time from the start of the selection to its result.
    fn record_selection(&self, outcome: &str, duration: Duration) {
        let _ = (outcome, duration);
    }

    /// Records the number of queued requests after a dispatcher pass.
    fn record_queue_depth(&self, depth: usize) {
        let _ = depth;
    }

    /// Records that a topology snapshot was published.
    fn record_topology_update(&self) {}
}

/// No-op metrics implementation.
#[derive(Debug, Clone, Copy)]
pub struct NoopSelectionMetrics;

impl SelectionMetrics for NoopSelectionMetrics {}

/// Metrics implementation using the [`metrics`](https://docs.rs/metrics) crate facade.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSelectionMetrics;

/// Metric name constants for the `metrics` crate facade.
mod metric_names {
    /// Completed selections by outcome.
    pub const SELECTION_TOTAL: &str = "tessera_selection_total";
    /// Selection duration distribution.
    pub const SELECTION_DURATION: &str = "tessera_selection_duration_seconds";
    /// Queued requests.
    pub const QUEUE_DEPTH: &str = "tessera_selection_queue_depth";
    /// Published snapshots.
    pub const TOPOLOGY_UPDATES_TOTAL: &str = "tessera_topology_updates_total";
}

impl SelectionMetrics for MetricsSelectionMetrics {
    fn record_selection(&self, outcome: &str, duration: Duration) {
        metrics::counter!(metric_names::SELECTION_TOTAL, "outcome" => outcome.to_owned())
            .increment(1);
        metrics::histogram!(metric_names::SELECTION_DURATION, "outcome" => outcome.to_owned())
            .record(duration.as_secs_f64());
    }

    fn record_queue_depth(&self, depth: usize) {
        metrics::gauge!(metric_names::QUEUE_DEPTH).set(depth as f64);
    }

    fn record_topology_update(&self) {
        metrics::counter!(metric_names::TOPOLOGY_UPDATES_TOTAL).increment(1);
    }
}

/// Creates the default metrics instance (no-op).
pub(crate) fn default_metrics() -> Arc<dyn SelectionMetrics> {
    Arc::new(NoopSelectionMetrics)
}
