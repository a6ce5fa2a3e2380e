//! Direct selection: the caller's own task waits for a matching node.
//!
//! ## Test Categories
//!
//! - **Deadlines**: zero and expiring deadlines
//! - **Compatibility**: incompatible nodes fail before any deadline
//! - **Wakeups**: a publish wakes a waiting caller without polling
//! - **Registry race**: described but unregistered nodes are never returned
//! - **Deprioritization**: retries in one operation move to untried nodes
//! - **Interruption**: cancellation and close while waiting

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::time::Duration;

use common::{PROMPT, TestCluster, addr, primary, replica_set, secondary};
use tessera_cluster::{
    Incompatibility, OperationContext, ReadableSelector, SelectionError, WritableSelector,
    selector_fn,
};
use tessera_test_utils::TestClusterTimings;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Deadlines
// ============================================================================

#[tokio::test]
async fn test_zero_timeout_fails_without_waiting() {
    let t = TestCluster::slow_heartbeat();
    let ctx = OperationContext::new().with_timeout(Duration::ZERO);

    let started = Instant::now();
    let err = t.cluster.select_node(&WritableSelector, &ctx).await.unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(started.elapsed() < PROMPT);
    assert_eq!(t.backend.connect_count(), 0, "no refresh means no wait happened");
}

#[tokio::test]
async fn test_timeout_message_names_selector_and_topology() {
    let t = TestCluster::new(
        TestClusterTimings::builder()
            .server_selection_timeout(Duration::from_millis(60))
            .build(),
    );
    t.publish_registered(vec![secondary("s1")]);

    let err = t.cluster.select_node(&WritableSelector, &OperationContext::new()).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("WritableSelector"), "{message}");
    assert!(message.contains("type=REPLICA_SET"), "{message}");
    assert!(message.contains("s1:27017"), "{message}");
    assert!(t.backend.connect_count() >= 1, "waiting must request a refresh");
}

#[tokio::test]
async fn test_context_timeout_overrides_configured_timeout() {
    let t = TestCluster::slow_heartbeat();
    let ctx = OperationContext::new().with_timeout(Duration::from_millis(50));

    let err = timeout(PROMPT, t.cluster.select_node(&WritableSelector, &ctx))
        .await
        .expect("bounded by the context timeout")
        .unwrap_err();
    assert!(err.is_timeout());
}

// ============================================================================
// Compatibility
// ============================================================================

#[tokio::test]
async fn test_incompatibility_takes_precedence_over_timeout() {
    let t = TestCluster::fast();
    let old = primary("old").with_wire_versions(0, 3);
    t.publish_registered(vec![old]);

    let nothing = selector_fn("nothing", |_| Vec::new());
    let ctx = OperationContext::new().with_timeout(Duration::ZERO);
    let err = t.cluster.select_node(&nothing, &ctx).await.unwrap_err();

    match err {
        SelectionError::IncompatibleTopology { address, incompatibility, message } => {
            assert_eq!(address, addr("old"));
            assert_eq!(incompatibility, Incompatibility::NodeTooOld);
            assert!(message.contains("old:27017"), "{message}");
            assert!(message.contains("requires at least 7"), "{message}");
        },
        other => panic!("expected incompatibility, got {other:?}"),
    }
}

#[tokio::test]
async fn test_incompatible_node_blocks_matching_node() {
    let t = TestCluster::fast();
    let newer = secondary("new").with_wire_versions(40, 41);
    t.publish_registered(vec![primary("p"), newer]);

    let err = t.cluster.select_node(&WritableSelector, &OperationContext::new()).await.unwrap_err();
    assert!(matches!(
        err,
        SelectionError::IncompatibleTopology { incompatibility: Incompatibility::NodeTooNew, .. }
    ));
}

// ============================================================================
// Wakeups
// ============================================================================

#[tokio::test]
async fn test_publish_wakes_waiting_caller() {
    let t = TestCluster::slow_heartbeat();
    let cluster = t.cluster.clone();
    let waiter = tokio::spawn(async move {
        cluster.select_node(&WritableSelector, &OperationContext::new()).await
    });

    tokio::task::yield_now().await;
    t.publish_registered(vec![primary("p")]);

    let selected = timeout(PROMPT, waiter).await.expect("woken by publish").unwrap().unwrap();
    assert_eq!(selected.address(), &addr("p"));
}

#[tokio::test]
async fn test_irrelevant_publish_keeps_caller_waiting() {
    let t = TestCluster::slow_heartbeat();
    let cluster = t.cluster.clone();
    let waiter = tokio::spawn(async move {
        cluster.select_node(&WritableSelector, &OperationContext::new()).await
    });

    tokio::task::yield_now().await;
    t.publish_registered(vec![secondary("s")]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    t.publish_registered(vec![secondary("s"), primary("p")]);
    let selected = timeout(PROMPT, waiter).await.unwrap().unwrap().unwrap();
    assert_eq!(selected.address(), &addr("p"));
}

// ============================================================================
// Registry race
// ============================================================================

#[tokio::test]
async fn test_unregistered_node_is_never_selected() {
    let t = TestCluster::new(
        TestClusterTimings::builder()
            .server_selection_timeout(Duration::from_millis(60))
            .build(),
    );
    // Described but no handle registered.
    t.cluster.publish_topology(replica_set(vec![primary("p")]));

    let err = t.cluster.select_node(&WritableSelector, &OperationContext::new()).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[tokio::test]
async fn test_deregistered_node_is_skipped() {
    let t = TestCluster::fast();
    t.publish_registered(vec![secondary("a"), secondary("b")]);
    t.backend.deregister(&addr("a"));

    for _ in 0..10 {
        let selected =
            t.cluster.select_node(&ReadableSelector, &OperationContext::new()).await.unwrap();
        assert_eq!(selected.address(), &addr("b"));
    }
}

// ============================================================================
// Deprioritization
// ============================================================================

#[tokio::test]
async fn test_second_attempt_prefers_untried_node() {
    let t = TestCluster::fast();
    t.publish_registered(vec![secondary("a"), secondary("b")]);
    let ctx = OperationContext::new();

    let first = t.cluster.select_node(&ReadableSelector, &ctx).await.unwrap();
    let second = t.cluster.select_node(&ReadableSelector, &ctx).await.unwrap();
    assert_ne!(first.address(), second.address());

    // Everything tried: any node is acceptable again.
    let third = t.cluster.select_node(&ReadableSelector, &ctx).await.unwrap();
    assert!(third.address() == &addr("a") || third.address() == &addr("b"));
}

#[tokio::test]
async fn test_tried_node_reused_when_only_choice() {
    let t = TestCluster::fast();
    t.publish_registered(vec![secondary("a"), secondary("b")]);
    let ctx = OperationContext::new();

    let first = t.cluster.select_node(&ReadableSelector, &ctx).await.unwrap();
    let other = if first.address() == &addr("a") { addr("b") } else { addr("a") };
    t.backend.deregister(&other);

    let second = t.cluster.select_node(&ReadableSelector, &ctx).await.unwrap();
    assert_eq!(second.address(), first.address());
}

#[tokio::test]
async fn test_separate_operations_do_not_share_deprioritization() {
    let t = TestCluster::fast();
    t.publish_registered(vec![secondary("a"), secondary("b")]);

    let first = OperationContext::new();
    t.cluster.select_node(&ReadableSelector, &first).await.unwrap();
    let second = OperationContext::new();
    t.cluster.select_node(&ReadableSelector, &second).await.unwrap();

    assert_eq!(first.deprioritization().attempted().len(), 1);
    assert_eq!(second.deprioritization().attempted().len(), 1);
}

// ============================================================================
// Interruption
// ============================================================================

#[tokio::test]
async fn test_cancellation_yields_cancelled() {
    let t = TestCluster::slow_heartbeat();
    let token = CancellationToken::new();
    let ctx = OperationContext::new().with_cancellation(token.clone());
    let cluster = t.cluster.clone();
    let waiter = tokio::spawn(async move { cluster.select_node(&WritableSelector, &ctx).await });

    tokio::task::yield_now().await;
    token.cancel();

    let err = timeout(PROMPT, waiter).await.unwrap().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Interrupted while waiting for a node that matches WritableSelector");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_cancelled_attempt_records_nothing() {
    let t = TestCluster::slow_heartbeat();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = OperationContext::new().with_cancellation(token);

    let err = t.cluster.select_node(&WritableSelector, &ctx).await.unwrap_err();
    assert!(matches!(err, SelectionError::Cancelled { .. }));
    assert!(ctx.deprioritization().is_empty());
}

#[tokio::test]
async fn test_close_releases_waiting_caller() {
    let t = TestCluster::slow_heartbeat();
    let cluster = t.cluster.clone();
    let waiter = tokio::spawn(async move {
        cluster.select_node(&WritableSelector, &OperationContext::new()).await
    });

    tokio::task::yield_now().await;
    t.cluster.close();

    let err = timeout(PROMPT, waiter).await.expect("released by close").unwrap().unwrap_err();
    assert!(matches!(err, SelectionError::ClusterClosed));
}
