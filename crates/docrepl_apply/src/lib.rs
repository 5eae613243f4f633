//! # docrepl Apply
//!
//! Transactional application of replicated change events.
//!
//! This crate provides:
//! - `MessageListener`, the entry point fed by the message substrate
//! - `Replicator`, which dispatches envelopes to document and collection
//!   handlers
//! - `ApplyScope` and `transactional` for scoped session, transaction and
//!   lock handling
//! - Transparent gzip handling of payloads
//! - The `ReplicationError` taxonomy
//!
//! ## Apply Protocol
//!
//! Every handler follows the same sequence:
//! 1. Resolve permissions and content type (no store access)
//! 2. Acquire a broker session and begin one transaction
//! 3. Write-lock the affected collections, source before destination
//! 4. Mutate, then commit, or abort on any failure
//! 5. Release locks in reverse order, close the transaction, release the
//!    session
//!
//! ## Key Invariants
//!
//! - A failed apply leaves the store unchanged
//! - Sessions, transactions and locks are released on every exit path
//! - Errors are logged once and returned unchanged, never retried

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
pub mod compression;
mod config;
mod dispatch;
mod document;
mod error;
mod listener;
mod replicator;
mod scope;

pub use config::ApplyConfig;
pub use dispatch::{route, Route, DISPATCH_TABLE};
pub use error::{ErrorKind, ReplicationError, ReplicationResult};
pub use listener::MessageListener;
pub use replicator::Replicator;
pub use scope::{transactional, ApplyScope, Outcome};
