//! # docrepl Testkit
//!
//! Test utilities for docrepl.
//!
//! This crate provides:
//! - `TestReplica`, a replica wired to the in-memory collaborators
//! - Property-based test generators using proptest
//! - Inbound message vectors shared with producers
//! - Test log setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docrepl_testkit::prelude::*;
//!
//! #[test]
//! fn applies_vector() {
//!     let replica = TestReplica::new();
//!     replica.seed_collection("/db/site");
//!     for vector in message_vectors() {
//!         let _ = replica.listener().on_message(&vector.to_message());
//!     }
//!     replica.assert_no_leaks();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use vectors::*;
