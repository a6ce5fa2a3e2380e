//! Structured selection log records.
//!
//! Each record is built only when its level is enabled for the
//! `tessera::server_selection` target, so the topology summary is never
//! rendered for a disabled logger. Optional fields are omitted rather than
//! recorded as empty.

use std::{fmt, time::Duration};

use tessera_types::{ServerAddress, TopologySnapshot};
use tracing::Level;

use crate::{cluster::ClusterId, context::OperationContext, error::SelectionError};

/// Target for the selection records.
pub const SELECTION_TARGET: &str = "tessera::server_selection";

/// Target for cluster lifecycle records.
pub const CLUSTER_TARGET: &str = "tessera::cluster";

/// Failure text used for timeouts, which would otherwise repeat the selector
/// and topology already present as separate fields.
const TIMEOUT_FAILURE: &str = "timed out while waiting for a suitable node";

pub(crate) fn selection_started(
    cluster_id: &ClusterId,
    ctx: &OperationContext,
    selector: &dyn fmt::Display,
    snapshot: &TopologySnapshot,
) {
    if tracing::enabled!(target: SELECTION_TARGET, Level::DEBUG) {
        tracing::debug!(
            target: SELECTION_TARGET,
            cluster_id = %cluster_id,
            operation = ctx.name(),
            operation_id = ctx.id(),
            selector = %selector,
            topology_description = %snapshot.short_description(),
            "Server selection started"
        );
    }
}

pub(crate) fn selection_waiting(
    cluster_id: &ClusterId,
    ctx: &OperationContext,
    remaining: Option<Duration>,
    selector: &dyn fmt::Display,
    snapshot: &TopologySnapshot,
) {
    if tracing::enabled!(target: SELECTION_TARGET, Level::INFO) {
        tracing::info!(
            target: SELECTION_TARGET,
            cluster_id = %cluster_id,
            operation = ctx.name(),
            operation_id = ctx.id(),
            remaining_time_ms = remaining.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            selector = %selector,
            topology_description = %snapshot.short_description(),
            "Waiting for suitable server to become available"
        );
    }
}

pub(crate) fn selection_succeeded(
    cluster_id: &ClusterId,
    ctx: &OperationContext,
    address: &ServerAddress,
    selector: &dyn fmt::Display,
    snapshot: &TopologySnapshot,
) {
    if tracing::enabled!(target: SELECTION_TARGET, Level::DEBUG) {
        tracing::debug!(
            target: SELECTION_TARGET,
            cluster_id = %cluster_id,
            operation = ctx.name(),
            operation_id = ctx.id(),
            server_host = address.host(),
            server_port = address.port(),
            selector = %selector,
            topology_description = %snapshot.short_description(),
            "Server selection succeeded"
        );
    }
}

pub(crate) fn selection_failed(
    cluster_id: &ClusterId,
    ctx: &OperationContext,
    failure: &SelectionError,
    selector: &dyn fmt::Display,
    snapshot: &TopologySnapshot,
) {
    if tracing::enabled!(target: SELECTION_TARGET, Level::DEBUG) {
        let failure = match failure {
            SelectionError::SelectionTimeout { .. } => TIMEOUT_FAILURE.to_string(),
            other => other.to_string(),
        };
        tracing::debug!(
            target: SELECTION_TARGET,
            cluster_id = %cluster_id,
            operation = ctx.name(),
            operation_id = ctx.id(),
            failure = %failure,
            selector = %selector,
            topology_description = %snapshot.short_description(),
            "Server selection failed"
        );
    }
}
