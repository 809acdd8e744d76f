//! # feedcache Testkit
//!
//! Test utilities for feedcache.
//!
//! This crate provides:
//! - Random record fixtures and pre-seeded stores
//! - Property-based test generators using proptest
//! - Mutation workloads that keep an expected model alongside the store
//! - Polling helpers for asserting on eventually consistent state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedcache_testkit::prelude::*;
//!
//! let store = seeded_store(100);
//! wait_until(Duration::from_secs(1), || cache.len() == 100).await;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod wait;
pub mod workload;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::wait::*;
    pub use crate::workload::*;
}

pub use fixtures::*;
pub use generators::*;
pub use wait::*;
pub use workload::*;
