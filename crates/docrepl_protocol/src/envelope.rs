//! Decoded change events.

use crate::metadata::{Metadata, PropertyValue};
use crate::resource::{ResourceOperation, ResourceType};
use bytes::Bytes;
use docrepl_store::ResourcePath;
use std::fmt::Write;

/// One replicated change event.
///
/// Produced by [`crate::Decoder`] and read-only afterwards.
///
/// # Fields
///
/// - `resource_type`: document or collection
/// - `operation`: what happened to the resource
/// - `source_path`: the resource the change applies to
/// - `destination_path`: target of a move or copy, `None` otherwise
/// - `payload`: document content, possibly gzip-compressed
/// - `metadata`: every other message property
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Resource kind.
    pub resource_type: ResourceType,
    /// Operation performed on the primary.
    pub operation: ResourceOperation,
    /// Path of the affected resource.
    pub source_path: ResourcePath,
    /// Target path for move and copy.
    pub destination_path: Option<ResourcePath>,
    /// Message body, absent when empty.
    pub payload: Option<Bytes>,
    /// Remaining message properties.
    pub metadata: Metadata,
}

impl Envelope {
    /// Creates an envelope with no destination, payload or metadata.
    pub fn new(
        resource_type: ResourceType,
        operation: ResourceOperation,
        source_path: ResourcePath,
    ) -> Self {
        Self {
            resource_type,
            operation,
            source_path,
            destination_path: None,
            payload: None,
            metadata: Metadata::new(),
        }
    }

    /// Sets the destination path.
    #[must_use]
    pub fn with_destination(mut self, destination: ResourcePath) -> Self {
        self.destination_path = Some(destination);
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Adds a metadata property.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Payload size in bytes, zero when absent.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Bytes::len)
    }

    /// One-line summary for logs.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = format!(
            "{} {} source={}",
            self.resource_type, self.operation, self.source_path
        );
        if let Some(destination) = &self.destination_path {
            let _ = write!(out, " destination={destination}");
        }
        if self.payload_len() > 0 {
            let _ = write!(out, " payload={}B", self.payload_len());
        }
        for (key, value) in self.metadata.iter() {
            let _ = write!(out, " {key}='{value}'");
        }
        out
    }
}
