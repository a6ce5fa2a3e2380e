//! Client-side topology coordinator for a clustered database deployment.
//!
//! Monitoring publishes immutable topology snapshots; operations ask the
//! coordinator for a node that satisfies their selection policy and, if none
//! does yet, wait for the next snapshot until a deadline passes.
//!
//! # Features
//!
//! - **No missed wakeups**: every snapshot is published under a fresh phase,
//!   and waiters block on the phase they read alongside the snapshot
//! - **Two waiting styles**: wait on the calling task, or hand the request to a
//!   single background dispatcher and receive the result through a callback
//! - **Composable selection**: a per-attempt pipeline of independent stages
//! - **Typed failures**: incompatibility, timeout, cancellation and shutdown
//!   are distinct [`SelectionError`] variants
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tessera_cluster::mock::{MockBackend, MockNodeFactory};
//! use tessera_cluster::{Cluster, ClusterId, ClusterSettings, OperationContext, ReadableSelector};
//!
//! # async fn example() -> tessera_cluster::Result<()> {
//! let cluster = Cluster::new(
//!     ClusterId::generate(),
//!     ClusterSettings::default(),
//!     Arc::new(MockBackend::new()),
//!     Arc::new(MockNodeFactory::new()),
//! );
//!
//! let ctx = OperationContext::new().with_name("find");
//! let node = cluster.select_node(&ReadableSelector, &ctx).await?;
//! println!("reading from {}", node.address());
//!
//! cluster.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Cluster (Public API)                     │
//! │ select_node │ select_node_with_callback │ publish │ close    │
//! ├──────────────────────────────────────────────────────────────┤
//! │          Published (snapshot + phase) behind ArcSwap         │
//! ├─────────────────────────────┬────────────────────────────────┤
//! │   Direct wait (caller task) │   Dispatcher (one task)        │
//! ├─────────────────────────────┴────────────────────────────────┤
//! │                     Selection pipeline                       │
//! │ registered │ caller │ deprioritized │ ranking stages         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod cluster;
mod compatibility;
mod config;
mod context;
mod dispatcher;
mod error;
mod listener;
mod logging;
mod metrics;
pub mod mock;
mod node;
mod phase;
mod selector;

pub use clock::{ClusterClock, ClusterTime};
pub use cluster::{Cluster, ClusterId};
pub use config::{ClusterSettings, ClusterSettingsBuilder};
pub use context::{Deprioritization, OperationContext};
pub use error::{Incompatibility, Result, SelectionError};
pub use listener::{
    ClusterClosedEvent, ClusterDescriptionChangedEvent, ClusterListener, ClusterOpeningEvent,
    NoopClusterListener,
};
pub use logging::{CLUSTER_TARGET, SELECTION_TARGET};
pub use metrics::{MetricsSelectionMetrics, NoopSelectionMetrics, SelectionMetrics};
pub use node::{ClusterBackend, ClusterableNode, NodeFactory, NodeRegistrySnapshot, SelectedNode};
pub use selector::{
    AddressSelector, AtMostTwoRandom, CompositeSelector, DeprioritizedNodes, FnSelector,
    LatencyWindow, LeastLoaded, NodeSelector, ReadableSelector, RegisteredNodes, WritableSelector,
    selector_fn,
};
// Re-export the value types callers need alongside the coordinator.
pub use tessera_types::{
    ClusterType, ConnectionMode, NodeDescription, NodeRole, NodeState, ServerAddress,
    TopologySnapshot, config::ClusterConfig,
};
