//! The topology coordinator.
//!
//! A [`Cluster`] holds the current [`TopologySnapshot`] together with the
//! [`Phase`] it was published under, and answers "which node should this
//! operation use?" against it. Callers either wait on their own task
//! ([`Cluster::select_node`]) or hand the wait to a background dispatcher
//! ([`Cluster::select_node_with_callback`]).
//!
//! One mutex orders every installation of a snapshot, the lazy start of the
//! dispatcher and shutdown. It is never held across selection or a wait.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rand::Rng;
use tessera_types::{ServerAddress, TopologySnapshot, would_generate_equivalent_events};
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::ClusterClock,
    compatibility::{incompatibility_error, timeout_error},
    config::ClusterSettings,
    context::OperationContext,
    dispatcher::{Dispatcher, SelectionRequest, outcome_label},
    error::{CancelledSnafu, InternalSnafu, Result, SelectionError},
    listener::{
        ClusterClosedEvent, ClusterDescriptionChangedEvent, ClusterListener, ClusterOpeningEvent,
    },
    logging::{self, CLUSTER_TARGET},
    node::{ClusterBackend, ClusterableNode, NodeFactory, SelectedNode},
    phase::{Phase, Published},
    selector::{NodeSelector, pipeline},
};

/// Identifier of one cluster instance, attached to its events and log records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterId(Arc<str>);

impl ClusterId {
    /// Creates an identifier from a caller-chosen value.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Creates a random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let value: u64 = rand::rng().random();
        Self::new(format!("{value:016x}"))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-side view of a clustered deployment.
///
/// Cloning is cheap; clones share state. Dropping the last clone without
/// calling [`close`](Self::close) stops the dispatcher, which then fails its
/// queued requests with [`SelectionError::ShutdownInProgress`].
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use tessera_cluster::{Cluster, ClusterId, ClusterSettings, OperationContext, WritableSelector};
/// # use tessera_cluster::mock::{MockBackend, MockNodeFactory};
/// # async fn example() -> tessera_cluster::Result<()> {
/// let cluster = Cluster::new(
///     ClusterId::new("orders"),
///     ClusterSettings::default(),
///     Arc::new(MockBackend::new()),
///     Arc::new(MockNodeFactory::new()),
/// );
/// let selected = cluster.select_node(&WritableSelector, &OperationContext::new()).await?;
/// println!("sending to {}", selected.address());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cluster {
    inner: Arc<ClusterInner>,
}

pub(crate) struct ClusterInner {
    id: ClusterId,
    settings: ClusterSettings,
    backend: Arc<dyn ClusterBackend>,
    factory: Arc<dyn NodeFactory>,
    published: ArcSwap<Published>,
    state: Mutex<LockedState>,
    closed: AtomicBool,
    clock: ClusterClock,
    shutdown: CancellationToken,
    pending: Arc<AtomicUsize>,
}

/// State guarded by the cluster mutex besides the published pair.
struct LockedState {
    /// Producer side of the dispatcher queue. `None` until the first request
    /// is queued, and again after close.
    queue: Option<mpsc::UnboundedSender<SelectionRequest>>,
}

impl Cluster {
    /// Creates a cluster with an empty topology of unknown type.
    ///
    /// Emits the opening event before returning.
    #[must_use]
    pub fn new(
        id: ClusterId,
        settings: ClusterSettings,
        backend: Arc<dyn ClusterBackend>,
        factory: Arc<dyn NodeFactory>,
    ) -> Self {
        let initial = Arc::new(TopologySnapshot::initial(settings.config().mode));
        let inner = ClusterInner {
            id,
            settings,
            backend,
            factory,
            published: ArcSwap::from_pointee(Published {
                snapshot: Arc::clone(&initial),
                phase: Phase::first(),
            }),
            state: Mutex::new(LockedState { queue: None }),
            closed: AtomicBool::new(false),
            clock: ClusterClock::new(),
            shutdown: CancellationToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
        };
        inner.notify("cluster_opening", |listener| {
            listener.cluster_opening(&ClusterOpeningEvent { cluster_id: inner.id.clone(), initial });
        });
        Self { inner: Arc::new(inner) }
    }

    /// Selects a node, waiting on the calling task until one matches.
    ///
    /// Each pass checks compatibility, runs the selection pipeline and then
    /// the deadline. Between passes the task waits for the next topology
    /// change, at most until the deadline and never longer than the minimum
    /// heartbeat interval, after asking the backend to refresh.
    ///
    /// # Errors
    ///
    /// - [`SelectionError::ClusterClosed`] if the cluster is or becomes closed.
    /// - [`SelectionError::IncompatibleTopology`] if any node falls outside the
    ///   supported wire-version range.
    /// - [`SelectionError::SelectionTimeout`] if the deadline passes.
    /// - [`SelectionError::Cancelled`] if the context's cancellation token fires.
    pub async fn select_node(
        &self,
        selector: &dyn NodeSelector,
        ctx: &OperationContext,
    ) -> Result<SelectedNode> {
        let started = Instant::now();
        let result = self.inner.select_direct(selector, ctx, started).await;
        self.inner.settings.metrics().record_selection(outcome_label(&result), started.elapsed());
        result
    }

    /// Selects a node without waiting on the calling task.
    ///
    /// The first pass runs immediately. If it neither succeeds nor fails
    /// terminally the request is queued for the dispatcher, which is started
    /// on first use. `callback` is invoked exactly once, either on the calling
    /// task or on the dispatcher. A callback that panics is contained.
    ///
    /// Queued requests must be created from within a Tokio runtime; otherwise
    /// the callback receives [`SelectionError::Internal`].
    pub fn select_node_with_callback<S, F>(&self, selector: S, ctx: OperationContext, callback: F)
    where
        S: NodeSelector + 'static,
        F: FnOnce(Result<SelectedNode>) + Send + 'static,
    {
        let inner = &self.inner;
        let started = Instant::now();
        let deadline = inner.deadline(&ctx, started);
        let mut request = SelectionRequest::new(
            Arc::new(selector),
            ctx,
            started,
            deadline,
            Box::new(callback),
            Arc::clone(inner.settings.metrics()),
        );

        let published = inner.published();
        if inner.is_closed() {
            let err = inner.fail(
                &request.context,
                &request.selector,
                &published.snapshot,
                SelectionError::ClusterClosed,
            );
            request.complete(Err(err));
            return;
        }

        logging::selection_started(
            &inner.id,
            &request.context,
            &request.selector,
            &published.snapshot,
        );
        match inner.evaluate(&mut request, &published) {
            Some(result) => request.complete(result),
            None => inner.enqueue(request),
        }
    }

    /// Selects a node through the dispatcher and awaits the result.
    ///
    /// # Errors
    ///
    /// Any error [`select_node_with_callback`](Self::select_node_with_callback)
    /// may deliver.
    pub async fn select_node_queued<S>(&self, selector: S, ctx: OperationContext) -> Result<SelectedNode>
    where
        S: NodeSelector + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.select_node_with_callback(selector, ctx, move |result| {
            let _ = sender.send(result);
        });
        receiver.await.unwrap_or_else(|_| {
            InternalSnafu { message: "selection callback dropped without a result" }.fail()
        })
    }

    /// Installs `snapshot` as the current topology and wakes every waiter.
    ///
    /// The change event is emitted only when the snapshot differs observably
    /// from its predecessor, but the phase always advances. Events are emitted
    /// in installation order. Publishing to a closed cluster is ignored.
    pub fn publish_topology(&self, snapshot: TopologySnapshot) {
        let inner = &self.inner;
        let current = Arc::new(snapshot);

        let _state = inner.state.lock();
        if inner.is_closed() {
            tracing::debug!(
                target: CLUSTER_TARGET,
                cluster_id = %inner.id,
                "Ignoring topology published to a closed cluster"
            );
            return;
        }
        tracing::debug!(
            target: CLUSTER_TARGET,
            cluster_id = %inner.id,
            description = %current.short_description(),
            "Updating cluster description"
        );

        let previous = inner.install(Arc::clone(&current));
        inner.settings.metrics().record_topology_update();
        if !would_generate_equivalent_events(&previous.snapshot, &current) {
            inner.notify("cluster_description_changed", |listener| {
                listener.cluster_description_changed(&ClusterDescriptionChangedEvent {
                    cluster_id: inner.id.clone(),
                    previous: Arc::clone(&previous.snapshot),
                    current: Arc::clone(&current),
                });
            });
        }
    }

    /// Closes the cluster. Idempotent.
    ///
    /// Wakes direct waiters, which then fail with
    /// [`SelectionError::ClusterClosed`], emits the closed event and stops the
    /// dispatcher, which fails its queued requests with
    /// [`SelectionError::ShutdownInProgress`].
    pub fn close(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.published.load().phase.retire();
        inner.notify("cluster_closed", |listener| {
            listener.cluster_closed(&ClusterClosedEvent { cluster_id: inner.id.clone() });
        });
        inner.shutdown.cancel();
        state.queue = None;
        tracing::debug!(target: CLUSTER_TARGET, cluster_id = %inner.id, "Cluster closed");
    }

    /// Returns whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Returns the latest published snapshot without blocking.
    #[must_use]
    pub fn current_snapshot(&self) -> Arc<TopologySnapshot> {
        Arc::clone(&self.inner.published().snapshot)
    }

    /// Creates the node handle for `address` through the configured factory.
    #[must_use]
    pub fn create_node(&self, address: &ServerAddress) -> Arc<dyn ClusterableNode> {
        self.inner.factory.create(address)
    }

    /// Greatest cluster time gossiped by any node.
    #[must_use]
    pub fn clock(&self) -> &ClusterClock {
        &self.inner.clock
    }

    /// Number of queued requests not yet resolved.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Identifier of this cluster.
    #[must_use]
    pub fn id(&self) -> &ClusterId {
        &self.inner.id
    }

    /// Settings the cluster was created with.
    #[must_use]
    pub fn settings(&self) -> &ClusterSettings {
        &self.inner.settings
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.inner.id)
            .field("closed", &self.inner.is_closed())
            .field("snapshot", &self.inner.published().snapshot.short_description())
            .finish_non_exhaustive()
    }
}

impl ClusterInner {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn published(&self) -> Arc<Published> {
        self.published.load_full()
    }

    pub(crate) fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub(crate) fn backend(&self) -> &dyn ClusterBackend {
        self.backend.as_ref()
    }

    /// Installs a snapshot under a fresh phase and retires the previous one.
    /// The caller must hold the state lock.
    fn install(&self, snapshot: Arc<TopologySnapshot>) -> Arc<Published> {
        let previous = self.published.load_full();
        self.published.store(Arc::new(Published { snapshot, phase: previous.phase.next() }));
        previous.phase.retire();
        previous
    }

    fn deadline(&self, ctx: &OperationContext, started: Instant) -> Option<Instant> {
        ctx.timeout()
            .or(self.settings.server_selection_timeout())
            .and_then(|timeout| started.checked_add(timeout))
    }

    async fn select_direct(
        &self,
        selector: &dyn NodeSelector,
        ctx: &OperationContext,
        started: Instant,
    ) -> Result<SelectedNode> {
        let deadline = self.deadline(ctx, started);
        let heartbeat = self.settings.min_heartbeat_interval();
        let mut published = self.published();
        let mut logged_waiting = false;

        if self.is_closed() {
            return Err(self.fail(ctx, selector, &published.snapshot, SelectionError::ClusterClosed));
        }
        logging::selection_started(&self.id, ctx, selector, &published.snapshot);

        loop {
            if self.is_closed() {
                return Err(self.fail(
                    ctx,
                    selector,
                    &published.snapshot,
                    SelectionError::ClusterClosed,
                ));
            }
            if let Some(result) = self.attempt(selector, ctx, &published.snapshot, deadline) {
                return result;
            }

            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if !logged_waiting {
                logging::selection_waiting(&self.id, ctx, remaining, selector, &published.snapshot);
                logged_waiting = true;
            }
            self.backend.connect();

            let wait = remaining.map_or(heartbeat, |remaining| remaining.min(heartbeat));
            let interrupted = tokio::select! {
                biased;
                () = cancelled(ctx.cancellation()) => true,
                () = published.phase.retired() => false,
                () = tokio::time::sleep(wait) => false,
            };
            if interrupted {
                let err = CancelledSnafu { selector: selector.to_string() }.build();
                return Err(self.fail(ctx, selector, &published.snapshot, err));
            }
            published = self.published();
        }
    }

    /// One full selection pass. `None` means keep waiting.
    fn attempt(
        &self,
        selector: &dyn NodeSelector,
        ctx: &OperationContext,
        snapshot: &TopologySnapshot,
        deadline: Option<Instant>,
    ) -> Option<Result<SelectedNode>> {
        if !snapshot.is_compatible() {
            return Some(Err(self.fail(ctx, selector, snapshot, incompatibility_error(snapshot))));
        }
        if let Some(selected) = self.select_once(selector, ctx, snapshot) {
            return Some(Ok(selected));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(Err(self.fail(ctx, selector, snapshot, timeout_error(selector, snapshot))));
        }
        None
    }

    /// Evaluates a queued request against `published`.
    ///
    /// The pipeline only reruns when the phase moved since the request was
    /// last evaluated; the deadline is checked on every call.
    pub(crate) fn evaluate(
        &self,
        request: &mut SelectionRequest,
        published: &Published,
    ) -> Option<Result<SelectedNode>> {
        let snapshot = &published.snapshot;
        let generation = published.phase.generation();
        let first = request.phase.is_none();

        if request.phase != Some(generation) {
            request.phase = Some(generation);
            if !snapshot.is_compatible() {
                let err = incompatibility_error(snapshot);
                return Some(Err(self.fail(&request.context, &request.selector, snapshot, err)));
            }
            if let Some(selected) = self.select_once(&request.selector, &request.context, snapshot) {
                return Some(Ok(selected));
            }
        }

        let now = Instant::now();
        if request.timed_out(now) {
            let err = timeout_error(&request.selector, snapshot);
            return Some(Err(self.fail(&request.context, &request.selector, snapshot, err)));
        }
        if first {
            logging::selection_waiting(
                &self.id,
                &request.context,
                request.remaining(now),
                &request.selector,
                snapshot,
            );
        }
        None
    }

    /// Runs the pipeline once and records a hit for deprioritization.
    fn select_once(
        &self,
        selector: &dyn NodeSelector,
        ctx: &OperationContext,
        snapshot: &TopologySnapshot,
    ) -> Option<SelectedNode> {
        let registry = self.backend.nodes_snapshot();
        let selected =
            pipeline::select(selector, ctx.deprioritization(), &registry, &self.settings, snapshot)?;
        ctx.deprioritization().record(selected.address());
        logging::selection_succeeded(&self.id, ctx, selected.address(), selector, snapshot);
        Some(selected)
    }

    fn fail(
        &self,
        ctx: &OperationContext,
        selector: &dyn fmt::Display,
        snapshot: &TopologySnapshot,
        err: SelectionError,
    ) -> SelectionError {
        logging::selection_failed(&self.id, ctx, &err, selector, snapshot);
        err
    }

    /// Hands `request` to the dispatcher, starting it if needed.
    fn enqueue(self: &Arc<Self>, request: SelectionRequest) {
        if let Some((request, err)) = self.try_enqueue(request) {
            request.complete(Err(err));
        }
    }

    /// Returns the request with its failure when it could not be queued, so
    /// the callback runs outside the lock.
    fn try_enqueue(
        self: &Arc<Self>,
        request: SelectionRequest,
    ) -> Option<(SelectionRequest, SelectionError)> {
        let mut state = self.state.lock();
        if self.is_closed() {
            return Some((request, SelectionError::ShutdownInProgress));
        }

        self.pending.fetch_add(1, Ordering::AcqRel);
        let request = if let Some(queue) = &state.queue {
            match queue.send(request) {
                Ok(()) => {
                    // Same snapshot, new phase: wakes the dispatcher.
                    let current = Arc::clone(&self.published.load().snapshot);
                    self.install(current);
                    return None;
                },
                // The dispatcher exited; start a new one below.
                Err(mpsc::error::SendError(request)) => request,
            }
        } else {
            request
        };

        let Ok(runtime) = Handle::try_current() else {
            state.queue = None;
            self.pending.fetch_sub(1, Ordering::AcqRel);
            let err = InternalSnafu {
                message: "queued selection requires a Tokio runtime to run the dispatcher",
            }
            .build();
            return Some((request, err));
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Arc::downgrade(self),
            receiver,
            self.shutdown.clone(),
            Arc::clone(&self.pending),
            request,
        );
        state.queue = Some(sender);
        runtime.spawn(dispatcher.run());
        None
    }

    fn notify(&self, event: &'static str, emit: impl FnOnce(&dyn ClusterListener)) {
        let listener = self.settings.listener().as_ref();
        if panic::catch_unwind(AssertUnwindSafe(|| emit(listener))).is_err() {
            tracing::warn!(
                target: CLUSTER_TARGET,
                cluster_id = %self.id,
                event,
                "Cluster listener panicked"
            );
        }
    }
}

impl Drop for ClusterInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Completes when `token` fires; never completes without one.
async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
