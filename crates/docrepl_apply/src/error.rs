//! Error taxonomy of the apply path.

use crate::compression::CompressionError;
use docrepl_protocol::{DecodeError, ResourceOperation, ResourceType};
use docrepl_store::StoreError;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Result type for apply operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors surfaced while decoding or applying a change event.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// The message could not be decoded.
    #[error("cannot decode message: {0}")]
    Decode(#[from] DecodeError),

    /// No handler exists for the resource type and operation.
    #[error("unsupported operation {operation} on {resource_type}")]
    UnsupportedOperation {
        /// Resource type of the event.
        resource_type: ResourceType,
        /// Operation of the event.
        operation: ResourceOperation,
    },

    /// A collection or document the event refers to does not exist.
    #[error("{kind} not found: {path}")]
    ResourceNotFound {
        /// `collection` or `document`.
        kind: &'static str,
        /// The missing path.
        path: String,
    },

    /// Owner, group or mode could not be resolved.
    #[error("cannot resolve permissions: {0}")]
    PermissionResolution(String),

    /// No MIME type could be determined for a document.
    #[error("cannot determine MIME type for {path}")]
    MimeResolution {
        /// The document path.
        path: String,
    },

    /// The store or payload processing failed while applying the event.
    #[error("{context}: {source}")]
    Apply {
        /// What was being done.
        context: String,
        /// The underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The event contradicts the replica's current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Discriminant of [`ReplicationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ReplicationError::Decode`].
    Decode,
    /// See [`ReplicationError::UnsupportedOperation`].
    UnsupportedOperation,
    /// See [`ReplicationError::ResourceNotFound`].
    ResourceNotFound,
    /// See [`ReplicationError::PermissionResolution`].
    PermissionResolution,
    /// See [`ReplicationError::MimeResolution`].
    MimeResolution,
    /// See [`ReplicationError::Apply`].
    Apply,
    /// See [`ReplicationError::Conflict`].
    Conflict,
}

impl ErrorKind {
    /// Stable name, e.g. `resource_not_found`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::UnsupportedOperation => "unsupported_operation",
            ErrorKind::ResourceNotFound => "resource_not_found",
            ErrorKind::PermissionResolution => "permission_resolution",
            ErrorKind::MimeResolution => "mime_resolution",
            ErrorKind::Apply => "apply",
            ErrorKind::Conflict => "conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReplicationError {
    /// Wraps a failure that happened while applying an event.
    pub fn apply(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Apply {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Creates a missing-collection error.
    pub fn collection_not_found(path: impl ToString) -> Self {
        Self::ResourceNotFound {
            kind: "collection",
            path: path.to_string(),
        }
    }

    /// Creates a missing-document error.
    pub fn document_not_found(path: impl ToString) -> Self {
        Self::ResourceNotFound {
            kind: "document",
            path: path.to_string(),
        }
    }

    /// Creates a permission resolution error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::PermissionResolution(message.into())
    }

    /// Returns the error's kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReplicationError::Decode(_) => ErrorKind::Decode,
            ReplicationError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            ReplicationError::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            ReplicationError::PermissionResolution(_) => ErrorKind::PermissionResolution,
            ReplicationError::MimeResolution { .. } => ErrorKind::MimeResolution,
            ReplicationError::Apply { .. } => ErrorKind::Apply,
            ReplicationError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

impl From<StoreError> for ReplicationError {
    fn from(err: StoreError) -> Self {
        Self::apply("store operation failed", err)
    }
}

impl From<CompressionError> for ReplicationError {
    fn from(err: CompressionError) -> Self {
        Self::apply("cannot decompress payload", err)
    }
}
