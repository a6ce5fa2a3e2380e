//! Shared test utilities for the Tessera crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`test_cluster_config`] - Cluster configuration with short test timings
//! - [`TestClusterTimings`] - Builder for custom test timings
//! - [`strategies`] - Proptest generators for topology values

#![deny(unsafe_code)]

mod assertions;
pub use assertions::assert_eventually;

mod config;
pub use config::{TestClusterTimings, test_cluster_config};

pub mod strategies;
