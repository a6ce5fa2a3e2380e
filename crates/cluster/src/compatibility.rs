//! Classification of terminal selection failures.
//!
//! Incompatibility is checked on every attempt before the selection result is
//! used, because no amount of waiting resolves it. Timeouts carry the selector
//! and the topology at expiry so a single message explains the failure.

use std::fmt;

use tessera_types::{MIN_SUPPORTED_SERVER_RELEASE, TopologySnapshot};

use crate::error::{
    Incompatibility, IncompatibleTopologySnafu, InternalSnafu, SelectionError,
    SelectionTimeoutSnafu,
};

/// Builds the error for a snapshot that is not compatible with this client.
///
/// Older nodes are reported before newer ones. A snapshot that reports no
/// incompatible node at all, or a node that is both too old and too new, is an
/// invariant violation.
pub(crate) fn incompatibility_error(snapshot: &TopologySnapshot) -> SelectionError {
    let supported = &snapshot.supported;
    if let Some(node) = snapshot.find_incompatibly_older() {
        if node.incompatibly_newer_than(supported) {
            return InternalSnafu {
                message: format!("node at {} is both older and newer than supported", node.address),
            }
            .build();
        }
        return IncompatibleTopologySnafu {
            address: node.address.clone(),
            incompatibility: Incompatibility::NodeTooOld,
            message: format!(
                "Server at {} reports wire version {}, but this client requires at least {} \
                 (server release {}).",
                node.address, node.max_wire_version, supported.min, MIN_SUPPORTED_SERVER_RELEASE
            ),
        }
        .build();
    }
    if let Some(node) = snapshot.find_incompatibly_newer() {
        return IncompatibleTopologySnafu {
            address: node.address.clone(),
            incompatibility: Incompatibility::NodeTooNew,
            message: format!(
                "Server at {} requires wire version {}, but this client only supports up to {}.",
                node.address, node.min_wire_version, supported.max
            ),
        }
        .build();
    }
    InternalSnafu { message: "topology is incompatible but no node is older or newer than supported" }
        .build()
}

/// Builds the error for a selection whose deadline passed.
pub(crate) fn timeout_error(
    selector: &dyn fmt::Display,
    snapshot: &TopologySnapshot,
) -> SelectionError {
    SelectionTimeoutSnafu {
        message: format!(
            "Timed out while waiting for a node that matches {selector}. Client view of cluster \
             state is {}",
            snapshot.short_description()
        ),
    }
    .build()
}
