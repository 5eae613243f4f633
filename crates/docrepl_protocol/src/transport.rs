//! The inbound message abstraction of the message substrate.

use crate::metadata::PropertyValue;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use thiserror::Error;

/// Failure reported by the message substrate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading the message body failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A property could not be read.
    #[error("cannot read property {name}: {message}")]
    Property {
        /// Property name.
        name: String,
        /// Error message.
        message: String,
    },

    /// The message cannot be handled by this consumer.
    #[error("unsupported message: {0}")]
    Unsupported(String),
}

/// A raw message as delivered by the message substrate.
///
/// Messages carry a binary body and a set of named, typed properties.
pub trait TransportMessage {
    /// Names of all properties on the message.
    ///
    /// # Errors
    ///
    /// Fails if the substrate cannot enumerate the properties.
    fn property_names(&self) -> Result<Vec<String>, TransportError>;

    /// Returns one property, or `None` if the message does not carry it.
    ///
    /// # Errors
    ///
    /// Fails if the property exists but cannot be read.
    fn property(&self, name: &str) -> Result<Option<PropertyValue>, TransportError>;

    /// Declared length of the body in bytes.
    ///
    /// # Errors
    ///
    /// Fails if the substrate cannot report the length.
    fn body_length(&self) -> Result<u64, TransportError>;

    /// Opens the body for reading.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be opened.
    fn body_reader(&self) -> Result<Box<dyn Read + '_>, TransportError>;
}

/// An in-memory message.
///
/// Used by tests and by substrates that deliver whole messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundMessage {
    properties: BTreeMap<String, PropertyValue>,
    body: Bytes,
    declared_length: Option<u64>,
}

impl InboundMessage {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Overrides the declared body length, which otherwise equals the body size.
    #[must_use]
    pub fn with_declared_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// The body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl TransportMessage for InboundMessage {
    fn property_names(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.properties.keys().cloned().collect())
    }

    fn property(&self, name: &str) -> Result<Option<PropertyValue>, TransportError> {
        Ok(self.properties.get(name).cloned())
    }

    fn body_length(&self) -> Result<u64, TransportError> {
        Ok(self.declared_length.unwrap_or(self.body.len() as u64))
    }

    fn body_reader(&self) -> Result<Box<dyn Read + '_>, TransportError> {
        Ok(Box::new(Cursor::new(self.body.clone())))
    }
}
