//! Error types for store operations.

use crate::path::PathError;
use crate::types::{BrokerId, TxnId};
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred while reading resource content.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path could not be parsed.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// The transaction is not known to the store.
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxnId),

    /// The transaction was already committed or aborted.
    #[error("transaction {txn} is not active ({state})")]
    TransactionNotActive {
        /// The transaction.
        txn: TxnId,
        /// Its current state.
        state: String,
    },

    /// The broker session is not known to the store.
    #[error("unknown broker {0}")]
    UnknownBroker(BrokerId),

    /// No broker became available in time.
    #[error("broker pool exhausted: {active} of {capacity} brokers in use")]
    BrokerPoolExhausted {
        /// Brokers in use.
        active: usize,
        /// Pool capacity.
        capacity: usize,
    },

    /// A collection lock could not be acquired in time.
    #[error("timed out waiting for write lock on {path}")]
    LockTimeout {
        /// The collection path.
        path: String,
    },

    /// A mutation was attempted without holding the collection write lock.
    #[error("write lock on {path} is not held by {txn}")]
    LockNotHeld {
        /// The collection path.
        path: String,
        /// The transaction that attempted the mutation.
        txn: TxnId,
    },

    /// A collection does not exist.
    #[error("collection not found: {path}")]
    CollectionNotFound {
        /// The collection path.
        path: String,
    },

    /// A collection already exists.
    #[error("collection already exists: {path}")]
    CollectionExists {
        /// The collection path.
        path: String,
    },

    /// A document does not exist.
    #[error("document not found: {path}")]
    DocumentNotFound {
        /// The document path.
        path: String,
    },

    /// A document and a collection would share the same path.
    #[error("name conflict: {path} is already used by a {existing}")]
    NameConflict {
        /// The contested path.
        path: String,
        /// What already occupies the path.
        existing: &'static str,
    },

    /// A removal primitive was used on a document of the other kind.
    #[error("document {path} is not a {expected} resource")]
    WrongResourceKind {
        /// The document path.
        path: String,
        /// The kind the primitive handles.
        expected: &'static str,
    },

    /// XML content is not well-formed.
    #[error("malformed XML in {name}: {message}")]
    MalformedXml {
        /// Document name.
        name: String,
        /// Parser message.
        message: String,
    },

    /// Content handed to `store_xml_resource` differs from what was validated.
    #[error("content of {name} changed between validation and store")]
    ContentMismatch {
        /// Document name.
        name: String,
    },

    /// Binary content length differs from the declared length.
    #[error("length mismatch for {name}: declared {declared}, read {actual}")]
    LengthMismatch {
        /// Document name.
        name: String,
        /// Declared length.
        declared: u64,
        /// Bytes actually read.
        actual: u64,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a collection-not-found error.
    pub fn collection_not_found(path: impl ToString) -> Self {
        Self::CollectionNotFound {
            path: path.to_string(),
        }
    }

    /// Creates a document-not-found error.
    pub fn document_not_found(path: impl ToString) -> Self {
        Self::DocumentNotFound {
            path: path.to_string(),
        }
    }
}
