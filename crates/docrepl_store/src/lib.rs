//! # docrepl Store
//!
//! Replica store contracts and in-memory reference collaborators.
//!
//! This crate provides:
//! - `ResourcePath` for absolute namespace paths
//! - `ReplicaStore`, the transactional store the apply path writes to
//! - `SecurityManager` for account and group resolution
//! - `MimeTable` for content-type lookup
//! - `MemoryStore`, `MemorySecurityManager` and `DefaultMimeTable`
//!   reference implementations
//!
//! ## Key Invariants
//!
//! - Every mutation belongs to exactly one transaction
//! - Mutations require the collection write lock of the calling transaction
//! - An aborted transaction leaves no trace in the namespace

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod memory;
mod mime;
mod path;
mod security;
mod store;
mod types;
pub mod xml;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::{CollectionEntry, MemoryStore, Namespace, StoredDocument, TransactionState};
pub use mime::{DefaultMimeTable, MimeTable, MimeType};
pub use path::{PathError, ResourcePath};
pub use security::{Account, Group, MemorySecurityManager, SecurityManager};
pub use store::ReplicaStore;
pub use types::{
    BrokerId, CollectionHandle, DocumentHandle, DocumentKind, Permission, PermissionUpdate,
    StagedDocument, Subject, TxnId,
};
