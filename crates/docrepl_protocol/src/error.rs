//! Error types for message decoding.

use crate::resource::ParseEnumError;
use crate::transport::TransportError;
use docrepl_store::PathError;
use std::io;
use thiserror::Error;

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding an inbound message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A required property is absent.
    #[error("missing required property {name}")]
    MissingProperty {
        /// Property name.
        name: &'static str,
    },

    /// A structural property has the wrong type.
    #[error("property {name} must be a string, got {found}")]
    NotAString {
        /// Property name.
        name: &'static str,
        /// Type of the received value.
        found: &'static str,
    },

    /// A resource type or operation is outside its domain.
    #[error("property {name}: {source}")]
    UnknownValue {
        /// Property name.
        name: &'static str,
        /// Parse failure.
        #[source]
        source: ParseEnumError,
    },

    /// A path property is not a usable resource path.
    #[error("property {name} is not a valid resource path: {source}")]
    InvalidPath {
        /// Property name.
        name: &'static str,
        /// Parse failure.
        #[source]
        source: PathError,
    },

    /// A path property names the root, which has no parent collection.
    #[error("property {name} must name a resource below the root")]
    RootPath {
        /// Property name.
        name: &'static str,
    },

    /// The body exceeds the configured limit.
    #[error("payload of {length} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Declared or observed length.
        length: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The body ended before its declared length.
    #[error("payload truncated: declared {declared} bytes, read {read}")]
    Truncated {
        /// Declared length.
        declared: u64,
        /// Bytes read.
        read: u64,
    },

    /// Reading the body failed.
    #[error("I/O error reading payload: {0}")]
    Io(#[from] io::Error),

    /// The message substrate failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
