//! Per-operation selection state.
//!
//! An [`OperationContext`] belongs to one logical operation, which may select
//! a node several times across retries. It carries the addresses already
//! handed out to that operation so later attempts prefer other nodes.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use tessera_types::ServerAddress;
use tokio_util::sync::CancellationToken;

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Addresses already selected for one logical operation.
///
/// Clones share state, so a context cloned into a queued request records into
/// the same set as the caller's copy.
#[derive(Debug, Clone, Default)]
pub struct Deprioritization {
    attempted: Arc<Mutex<Vec<ServerAddress>>>,
}

impl Deprioritization {
    /// Records that `address` was handed out to this operation.
    pub fn record(&self, address: &ServerAddress) {
        let mut attempted = self.attempted.lock();
        if !attempted.contains(address) {
            attempted.push(address.clone());
        }
    }

    /// Returns whether `address` was already handed out.
    #[must_use]
    pub fn contains(&self, address: &ServerAddress) -> bool {
        self.attempted.lock().contains(address)
    }

    /// Returns the recorded addresses in selection order.
    #[must_use]
    pub fn attempted(&self) -> Vec<ServerAddress> {
        self.attempted.lock().clone()
    }

    /// Returns whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempted.lock().is_empty()
    }
}

/// Context of one logical operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    id: u64,
    name: Option<String>,
    deprioritization: Deprioritization,
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
}

impl OperationContext {
    /// Creates a context with a fresh operation id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed),
            name: None,
            deprioritization: Deprioritization::default(),
            timeout: None,
            cancellation: None,
        }
    }

    /// Sets the operation name reported in log records.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the cluster's selection timeout for this operation.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Lets the caller abort a waiting selection.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Operation id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Operation name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Addresses already selected for this operation.
    #[must_use]
    pub fn deprioritization(&self) -> &Deprioritization {
        &self.deprioritization
    }

    /// Selection timeout override.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Cancellation token, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = OperationContext::new();
        let b = OperationContext::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clone_shares_deprioritization() {
        let ctx = OperationContext::new().with_name("find");
        let copy = ctx.clone();
        copy.deprioritization().record(&ServerAddress::tcp("a", 1));

        assert!(ctx.deprioritization().contains(&ServerAddress::tcp("a", 1)));
        assert_eq!(ctx.id(), copy.id());
        assert_eq!(copy.name(), Some("find"));
    }

    #[test]
    fn test_record_is_deduplicated() {
        let deprioritization = Deprioritization::default();
        let addr = ServerAddress::tcp("a", 1);
        deprioritization.record(&addr);
        deprioritization.record(&addr);
        assert_eq!(deprioritization.attempted(), vec![addr]);
    }

    #[test]
    fn test_builder_methods() {
        let token = CancellationToken::new();
        let ctx = OperationContext::new()
            .with_timeout(Duration::from_millis(5))
            .with_cancellation(token.clone());
        assert_eq!(ctx.timeout(), Some(Duration::from_millis(5)));
        token.cancel();
        assert!(ctx.cancellation().unwrap().is_cancelled());
        assert!(ctx.deprioritization().is_empty());
    }
}
