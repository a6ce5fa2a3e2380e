//! Versioned one-shot change signal.
//!
//! Exactly one [`Phase`] is current at any time. Publishing a new topology
//! retires the current phase, which wakes everything waiting on it, and installs
//! a fresh one with the next generation. A retired phase is never reused.
//!
//! Waiters capture the phase together with the snapshot it was published with
//! and wait on that captured handle. Because retirement happens under the same
//! lock that installs the replacement, a waiter that captured phase `n` is
//! guaranteed to wake once phase `n + 1` exists.

use std::sync::Arc;

use tessera_types::TopologySnapshot;
use tokio_util::sync::CancellationToken;

/// One generation of the change signal.
#[derive(Debug, Clone)]
pub(crate) struct Phase {
    generation: u64,
    latch: CancellationToken,
}

impl Phase {
    /// The first phase of a cluster.
    pub(crate) fn first() -> Self {
        Self { generation: 0, latch: CancellationToken::new() }
    }

    /// The unsignaled successor of this phase.
    pub(crate) fn next(&self) -> Self {
        Self { generation: self.generation + 1, latch: CancellationToken::new() }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Wakes every waiter. Idempotent.
    pub(crate) fn retire(&self) {
        self.latch.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_retired(&self) -> bool {
        self.latch.is_cancelled()
    }

    /// Completes once this phase is retired.
    pub(crate) async fn retired(&self) {
        self.latch.cancelled().await;
    }
}

/// The snapshot and the phase it was published under.
///
/// Stored behind a single atomic pointer so readers always observe a matching
/// pair.
#[derive(Debug)]
pub(crate) struct Published {
    pub(crate) snapshot: Arc<TopologySnapshot>,
    pub(crate) phase: Phase,
}
