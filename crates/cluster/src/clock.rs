//! Cluster time gossip.
//!
//! Nodes stamp responses with a logical cluster time. The client keeps the
//! greatest value it has seen and attaches it to outgoing operations, so causal
//! ordering survives moving between nodes.

use parking_lot::Mutex;

/// A logical cluster time: wall-clock seconds plus an ordinal within the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterTime {
    /// Seconds since the Unix epoch.
    pub seconds: u32,
    /// Ordinal within `seconds`.
    pub increment: u32,
}

impl ClusterTime {
    /// Creates a cluster time.
    #[must_use]
    pub const fn new(seconds: u32, increment: u32) -> Self {
        Self { seconds, increment }
    }
}

/// Tracks the greatest cluster time seen.
#[derive(Debug, Default)]
pub struct ClusterClock {
    current: Mutex<Option<ClusterTime>>,
}

impl ClusterClock {
    /// Creates a clock that has seen nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the greatest cluster time seen so far.
    #[must_use]
    pub fn current(&self) -> Option<ClusterTime> {
        *self.current.lock()
    }

    /// Advances to `time` if it is greater than the current value.
    pub fn advance(&self, time: Option<ClusterTime>) {
        let Some(time) = time else { return };
        let mut current = self.current.lock();
        if current.is_none_or(|c| time > c) {
            *current = Some(time);
        }
    }

    /// Returns the greater of `other` and the current value.
    #[must_use]
    pub fn greater_of(&self, other: Option<ClusterTime>) -> Option<ClusterTime> {
        self.current().max(other)
    }
}
