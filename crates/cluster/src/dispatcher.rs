//! Background servicing of queued selection requests.
//!
//! A single dispatcher task per cluster owns every queued request. Producers
//! hand requests over through an unbounded channel; only the dispatcher ever
//! removes one, and it resolves each exactly once: on success, on a terminal
//! failure, or with [`SelectionError::ShutdownInProgress`] when the cluster
//! goes away or the runtime running the dispatcher shuts down.

use std::{
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Weak,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    cluster::ClusterInner,
    context::OperationContext,
    error::{InternalSnafu, Result, SelectionError},
    logging::CLUSTER_TARGET,
    metrics::SelectionMetrics,
    node::SelectedNode,
    phase::Published,
    selector::NodeSelector,
};

/// Continuation of a queued selection. Invoked exactly once.
pub(crate) type SelectionCallback = Box<dyn FnOnce(Result<SelectedNode>) + Send>;

/// Returns the metrics label for a selection outcome.
pub(crate) fn outcome_label(result: &Result<SelectedNode>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    }
}

/// Hands `result` to `callback`, containing any panic.
pub(crate) fn deliver(callback: SelectionCallback, result: Result<SelectedNode>, operation_id: u64) {
    if panic::catch_unwind(AssertUnwindSafe(move || callback(result))).is_err() {
        tracing::warn!(
            target: CLUSTER_TARGET,
            operation_id,
            "Selection callback panicked, result discarded"
        );
    }
}

/// A selection waiting for the topology to change.
pub(crate) struct SelectionRequest {
    pub(crate) selector: Arc<dyn NodeSelector>,
    pub(crate) context: OperationContext,
    started: Instant,
    deadline: Option<Instant>,
    /// Generation of the phase this request was last evaluated against.
    pub(crate) phase: Option<u64>,
    callback: SelectionCallback,
    metrics: Arc<dyn SelectionMetrics>,
}

impl SelectionRequest {
    pub(crate) fn new(
        selector: Arc<dyn NodeSelector>,
        context: OperationContext,
        started: Instant,
        deadline: Option<Instant>,
        callback: SelectionCallback,
        metrics: Arc<dyn SelectionMetrics>,
    ) -> Self {
        Self { selector, context, started, deadline, phase: None, callback, metrics }
    }

    /// Time left before the deadline, or `None` when waiting forever.
    pub(crate) fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(now))
    }

    pub(crate) fn timed_out(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Resolves the request, consuming it.
    pub(crate) fn complete(self, result: Result<SelectedNode>) {
        self.metrics.record_selection(outcome_label(&result), self.started.elapsed());
        deliver(self.callback, result, self.context.id());
    }
}

/// The single consumer of a cluster's request queue.
pub(crate) struct Dispatcher {
    cluster: Weak<ClusterInner>,
    queue: mpsc::UnboundedReceiver<SelectionRequest>,
    shutdown: CancellationToken,
    pending: Arc<AtomicUsize>,
    requests: Vec<SelectionRequest>,
}

impl Dispatcher {
    pub(crate) fn new(
        cluster: Weak<ClusterInner>,
        queue: mpsc::UnboundedReceiver<SelectionRequest>,
        shutdown: CancellationToken,
        pending: Arc<AtomicUsize>,
        first: SelectionRequest,
    ) -> Self {
        Self { cluster, queue, shutdown, pending, requests: vec![first] }
    }

    /// Services requests until the cluster is closed or dropped.
    ///
    /// Whatever is still queued when the task ends, including when its
    /// runtime shuts down and drops the task, is failed by `Drop`.
    pub(crate) async fn run(mut self) {
        tracing::debug!(target: CLUSTER_TARGET, "Selection dispatcher started");
        loop {
            let Some(cluster) = self.cluster.upgrade() else { break };
            if cluster.is_closed() {
                break;
            }

            // Load before draining: a request enqueued after the load retires
            // the loaded phase, so the wait below cannot miss it.
            let published = cluster.published();
            while let Ok(request) = self.queue.try_recv() {
                self.requests.push(request);
            }

            let wait = self.pass(&cluster, &published);
            drop(cluster);

            tokio::select! {
                () = published.phase.retired() => {},
                () = tokio::time::sleep(wait) => {},
                () = self.shutdown.cancelled() => {},
            }
        }
    }

    /// Evaluates every queued request once and returns how long to wait
    /// before the next pass.
    fn pass(&mut self, cluster: &ClusterInner, published: &Published) -> Duration {
        let mut wait = cluster.settings().min_heartbeat_interval();
        let mut kept = Vec::with_capacity(self.requests.len());

        for mut request in mem::take(&mut self.requests) {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| cluster.evaluate(&mut request, published)));
            match outcome {
                Ok(Some(result)) => self.finish(request, result),
                Ok(None) => {
                    if let Some(remaining) = request.remaining(Instant::now()) {
                        wait = wait.min(remaining);
                    }
                    kept.push(request);
                },
                Err(_) => {
                    tracing::warn!(
                        target: CLUSTER_TARGET,
                        operation_id = request.context.id(),
                        selector = %request.selector,
                        "Node selector panicked"
                    );
                    let err = InternalSnafu { message: "node selector panicked" }.build();
                    self.finish(request, Err(err));
                },
            }
        }

        self.requests = kept;
        if !self.requests.is_empty() {
            cluster.backend().connect();
        }
        cluster.settings().metrics().record_queue_depth(self.requests.len());
        wait
    }

    fn finish(&self, request: SelectionRequest, result: Result<SelectedNode>) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
        request.complete(result);
    }

    fn drain(&mut self) {
        self.queue.close();
        while let Ok(request) = self.queue.try_recv() {
            self.requests.push(request);
        }
        let count = self.requests.len();
        for request in mem::take(&mut self.requests) {
            self.finish(request, Err(SelectionError::ShutdownInProgress));
        }
        tracing::debug!(
            target: CLUSTER_TARGET,
            failed_requests = count,
            "Selection dispatcher stopped"
        );
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.drain();
    }
}
