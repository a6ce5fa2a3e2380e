//! Selection error types.
//!
//! Every failure of a selection attempt, whether delivered directly or through
//! a queued callback, is a [`SelectionError`]. Errors carry enough context to
//! explain themselves in a single log line.

use std::fmt;

use snafu::Snafu;
use tessera_types::ServerAddress;

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Which side of the supported wire-version range a node falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompatibility {
    /// The node only speaks versions older than this client supports.
    NodeTooOld,
    /// The node only speaks versions newer than this client supports.
    NodeTooNew,
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeTooOld => write!(f, "node_too_old"),
            Self::NodeTooNew => write!(f, "node_too_new"),
        }
    }
}

/// Node selection failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SelectionError {
    /// Selection was attempted on a closed cluster.
    #[snafu(display("Cluster is closed"))]
    ClusterClosed,

    /// A node speaks no wire version this client supports.
    #[snafu(display("{message}"))]
    IncompatibleTopology {
        /// Address of the offending node.
        address: ServerAddress,
        /// Direction of the mismatch.
        incompatibility: Incompatibility,
        /// Full diagnostic, naming the violated bound.
        message: String,
    },

    /// No suitable node appeared before the deadline.
    #[snafu(display("{message}"))]
    SelectionTimeout {
        /// Diagnostic naming the selector and the topology at expiry.
        message: String,
    },

    /// The caller cancelled the wait.
    #[snafu(display("Interrupted while waiting for a node that matches {selector}"))]
    Cancelled {
        /// Description of the selector being waited for.
        selector: String,
    },

    /// A queued request was still pending when the cluster closed.
    #[snafu(display("Shutdown in progress"))]
    ShutdownInProgress,

    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// An internal invariant was violated.
    #[snafu(display("Internal error: {message}"))]
    Internal {
        /// Error description.
        message: String,
    },
}

impl SelectionError {
    /// Returns true if an operation-level retry may succeed.
    ///
    /// A timeout may be followed by a topology that satisfies the selector,
    /// and a shutdown may race with a fresh client taking over. Everything
    /// else is permanent for the attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SelectionTimeout { .. } => true,
            Self::ShutdownInProgress => true,
            // Non-retryable
            Self::ClusterClosed => false,
            Self::IncompatibleTopology { .. } => false,
            Self::Cancelled { .. } => false,
            Self::Config { .. } => false,
            Self::Internal { .. } => false,
        }
    }

    /// Returns a stable label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClusterClosed => "cluster_closed",
            Self::IncompatibleTopology { .. } => "incompatible_topology",
            Self::SelectionTimeout { .. } => "selection_timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::ShutdownInProgress => "shutdown_in_progress",
            Self::Config { .. } => "config",
            Self::Internal { .. } => "internal",
        }
    }

    /// Returns true if this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SelectionTimeout { .. })
    }
}
