//! Concurrent publishers and waiters.
//!
//! The heartbeat in these tests is ten seconds and there is no deadline, so a
//! waiter that misses the final publish hangs until the test times out.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::{sync::Arc, time::Duration};

use common::{Results, TestCluster, addr, primary, secondary};
use tessera_cluster::{OperationContext, WritableSelector};
use tessera_test_utils::assert_eventually;
use tokio::time::timeout;

const WAITERS: usize = 32;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_waiter_misses_the_final_publish() {
    let t = Arc::new(TestCluster::slow_heartbeat());

    let direct: Vec<_> = (0..WAITERS)
        .map(|_| {
            let cluster = t.cluster.clone();
            tokio::spawn(async move {
                cluster.select_node(&WritableSelector, &OperationContext::new()).await
            })
        })
        .collect();

    let queued = Results::default();
    for _ in 0..WAITERS {
        t.cluster.select_node_with_callback(WritableSelector, OperationContext::new(), queued.callback());
    }

    // A stream of non-matching updates racing the waiters' wait setup.
    let publisher = {
        let t = t.clone();
        tokio::spawn(async move {
            for round in 0..50u16 {
                t.publish_registered(vec![secondary(&format!("s{round}"))]);
                tokio::task::yield_now().await;
            }
            t.publish_registered(vec![primary("p")]);
        })
    };
    publisher.await.unwrap();

    for waiter in direct {
        let selected = timeout(Duration::from_secs(5), waiter)
            .await
            .expect("direct waiter missed a wakeup")
            .unwrap()
            .unwrap();
        assert_eq!(selected.address(), &addr("p"));
    }
    assert!(
        assert_eventually(Duration::from_secs(5), || queued.len() == WAITERS).await,
        "queued waiter missed a wakeup"
    );
    assert!(queued.take().iter().all(Result::is_ok));
}
