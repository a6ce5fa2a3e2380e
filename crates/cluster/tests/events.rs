//! Topology publishing and lifecycle events.
//!
//! ## Test Categories
//!
//! - **Lifecycle**: opening and closed events
//! - **Filtering**: equivalent snapshots emit no change event but still wake waiters
//! - **Ordering**: events follow installation order under concurrent publishers

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::{sync::Arc, time::Duration};

use common::{PROMPT, TestCluster, addr, primary, replica_set, secondary};
use tessera_cluster::{
    ClusterId, ClusterListener, ClusterOpeningEvent, ClusterSettings, ClusterType, OperationContext,
    ReadableSelector,
    mock::{MockBackend, MockNodeFactory, RecordedEvent},
};
use tokio::time::timeout;

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_opening_event_carries_initial_snapshot() {
    let t = TestCluster::fast();
    let events = t.listener.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        RecordedEvent::Opening(event) => {
            assert_eq!(event.cluster_id, ClusterId::new("integration"));
            assert_eq!(event.initial.cluster_type, ClusterType::Unknown);
            assert!(event.initial.nodes.is_empty());
        },
        other => panic!("expected opening event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_close_emits_one_closed_event_after_changes() {
    let t = TestCluster::fast();
    t.publish_registered(vec![primary("p")]);
    t.cluster.close();
    t.cluster.close();

    let events = t.listener.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[1], RecordedEvent::Changed(_)));
    assert!(matches!(events[2], RecordedEvent::Closed(_)));
}

#[derive(Debug)]
struct PanickingListener;

impl ClusterListener for PanickingListener {
    fn cluster_opening(&self, _event: &ClusterOpeningEvent) {
        panic!("listener failure");
    }
}

#[tokio::test]
async fn test_panicking_listener_does_not_break_cluster() {
    let settings =
        ClusterSettings::builder().with_listener(Arc::new(PanickingListener)).build().unwrap();
    let backend = Arc::new(MockBackend::new());
    let cluster = tessera_cluster::Cluster::new(
        ClusterId::new("panicky"),
        settings,
        backend.clone(),
        Arc::new(MockNodeFactory::new()),
    );

    backend.register(&addr("s"));
    cluster.publish_topology(replica_set(vec![secondary("s")]));
    let selected = cluster.select_node(&ReadableSelector, &OperationContext::new()).await.unwrap();
    assert_eq!(selected.address(), &addr("s"));
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_equivalent_publish_emits_no_event() {
    let t = TestCluster::fast();
    t.publish_registered(vec![primary("p")]);
    t.publish_registered(vec![primary("p")]);
    t.publish_registered(vec![primary("p").with_round_trip_time(Duration::from_millis(7))]);
    assert_eq!(t.listener.changed_count(), 1);

    t.publish_registered(vec![secondary("p")]);
    assert_eq!(t.listener.changed_count(), 2);
}

#[tokio::test]
async fn test_equivalent_publish_still_wakes_waiters() {
    let t = TestCluster::slow_heartbeat();
    // Described but unregistered: the waiter cannot succeed yet.
    t.cluster.publish_topology(replica_set(vec![secondary("s")]));

    let cluster = t.cluster.clone();
    let waiter = tokio::spawn(async move {
        cluster.select_node(&ReadableSelector, &OperationContext::new()).await
    });
    tokio::task::yield_now().await;

    // Same topology, now with a handle. Only the phase change can wake the waiter.
    t.backend.register(&addr("s"));
    t.cluster.publish_topology(replica_set(vec![secondary("s")]));

    let selected = timeout(PROMPT, waiter).await.expect("woken by phase").unwrap().unwrap();
    assert_eq!(selected.address(), &addr("s"));
    assert_eq!(t.listener.changed_count(), 1);
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_change_events_follow_installation_order() {
    let t = Arc::new(TestCluster::fast());
    let mut publishers = Vec::new();
    for worker in 0..4u16 {
        let t = t.clone();
        publishers.push(tokio::spawn(async move {
            for round in 0..25u16 {
                let host = format!("w{worker}r{round}");
                t.cluster.publish_topology(replica_set(vec![secondary(&host)]));
                tokio::task::yield_now().await;
            }
        }));
    }
    for publisher in publishers {
        publisher.await.unwrap();
    }

    let changes: Vec<_> = t
        .listener
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Changed(change) => Some(change),
            _ => None,
        })
        .collect();
    assert_eq!(changes.len(), 100);
    for pair in changes.windows(2) {
        assert!(
            Arc::ptr_eq(&pair[0].current, &pair[1].previous),
            "each event must start where the previous one ended"
        );
    }
    assert!(Arc::ptr_eq(&changes[99].current, &t.cluster.current_snapshot()));
}
