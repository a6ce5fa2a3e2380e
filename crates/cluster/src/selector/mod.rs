//! Node selectors and the selection pipeline.
//!
//! A [`NodeSelector`] narrows a topology snapshot to the nodes it admits.
//! Selectors never mutate the snapshot and never block; they are combined by
//! sequential application in a [`CompositeSelector`], each stage seeing only
//! the survivors of the previous one.
//!
//! Every attempt builds a fresh pipeline:
//!
//! 1. [`RegisteredNodes`] drops nodes without a live handle
//! 2. the caller's selector
//! 3. [`DeprioritizedNodes`] steers retries away from nodes already tried
//! 4. the configured ranking stages ([`LatencyWindow`], [`AtMostTwoRandom`],
//!    [`LeastLoaded`], and the cluster's custom selector)

mod builtin;
mod composite;
mod guards;
pub(crate) mod pipeline;
mod ranking;

use std::{fmt, sync::Arc};

pub use builtin::{AddressSelector, FnSelector, ReadableSelector, WritableSelector, selector_fn};
pub use composite::CompositeSelector;
pub use guards::{DeprioritizedNodes, RegisteredNodes};
pub use ranking::{AtMostTwoRandom, LatencyWindow, LeastLoaded};
use tessera_types::{NodeDescription, TopologySnapshot};

/// Narrows a topology to the nodes admissible for an operation.
///
/// The `Display` form names the selector in log records and timeout messages.
pub trait NodeSelector: fmt::Display + Send + Sync {
    /// Returns the admissible subset of `snapshot.nodes`.
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription>;
}

impl<S: NodeSelector + ?Sized> NodeSelector for &S {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        (**self).select(snapshot)
    }
}

impl<S: NodeSelector + ?Sized> NodeSelector for Arc<S> {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        (**self).select(snapshot)
    }
}

impl<S: NodeSelector + ?Sized> NodeSelector for Box<S> {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        (**self).select(snapshot)
    }
}
