//! Conversion of inbound messages into [`Envelope`]s.

use crate::envelope::Envelope;
use crate::error::{DecodeError, DecodeResult};
use crate::metadata::Metadata;
use crate::resource::{ResourceOperation, ResourceType};
use crate::transport::TransportMessage;
use bytes::Bytes;
use docrepl_store::ResourcePath;
use serde::Deserialize;
use std::io::Read;
use tracing::trace;

/// Property holding the resource type.
pub const RESOURCE_TYPE: &str = "exist.resource.type";
/// Property holding the operation.
pub const RESOURCE_OPERATION: &str = "exist.resource.operation";
/// Property holding the source path.
pub const SOURCE_PATH: &str = "exist.source.path";
/// Property holding the destination path of a move or copy.
pub const DESTINATION_PATH: &str = "exist.destination.path";

const STRUCTURAL: [&str; 4] = [RESOURCE_TYPE, RESOURCE_OPERATION, SOURCE_PATH, DESTINATION_PATH];

/// Configuration for [`Decoder`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest accepted message body in bytes.
    pub max_payload_bytes: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl DecoderConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the payload limit.
    #[must_use]
    pub const fn with_max_payload_bytes(mut self, limit: u64) -> Self {
        self.max_payload_bytes = limit;
        self
    }
}

/// Decodes raw messages into envelopes.
///
/// Decoding touches nothing but the message: a message that fails here has
/// had no effect on any store.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a decoder.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes one message.
    ///
    /// # Errors
    ///
    /// Fails if a structural property is missing or invalid, if the body is
    /// too large or shorter than declared, or if the transport fails.
    pub fn decode(&self, message: &dyn TransportMessage) -> DecodeResult<Envelope> {
        let resource_type = required_string(message, RESOURCE_TYPE)?
            .parse::<ResourceType>()
            .map_err(|source| DecodeError::UnknownValue {
                name: RESOURCE_TYPE,
                source,
            })?;
        let operation = required_string(message, RESOURCE_OPERATION)?
            .parse::<ResourceOperation>()
            .map_err(|source| DecodeError::UnknownValue {
                name: RESOURCE_OPERATION,
                source,
            })?;

        let source_path = resource_path(SOURCE_PATH, &required_string(message, SOURCE_PATH)?)?;
        let destination_path = if operation.requires_destination() {
            Some(resource_path(
                DESTINATION_PATH,
                &required_string(message, DESTINATION_PATH)?,
            )?)
        } else {
            None
        };

        let payload = self.read_payload(message)?;

        let mut metadata = Metadata::new();
        for name in message.property_names()? {
            if STRUCTURAL.contains(&name.as_str()) {
                continue;
            }
            if let Some(value) = message.property(&name)? {
                metadata.insert(name, value);
            }
        }

        trace!(
            %resource_type,
            %operation,
            source = %source_path,
            payload_len = payload.as_ref().map_or(0, Bytes::len),
            properties = metadata.len(),
            "decoded message"
        );

        Ok(Envelope {
            resource_type,
            operation,
            source_path,
            destination_path,
            payload,
            metadata,
        })
    }

    fn read_payload(&self, message: &dyn TransportMessage) -> DecodeResult<Option<Bytes>> {
        let limit = self.config.max_payload_bytes;
        let declared = message.body_length()?;
        if declared > limit {
            return Err(DecodeError::PayloadTooLarge {
                length: declared,
                limit,
            });
        }
        if declared == 0 {
            return Ok(None);
        }

        let mut buf = Vec::new();
        message.body_reader()?.take(declared).read_to_end(&mut buf)?;

        let read = buf.len() as u64;
        if read < declared {
            return Err(DecodeError::Truncated { declared, read });
        }
        Ok(Some(Bytes::from(buf)))
    }
}

fn required_string(message: &dyn TransportMessage, name: &'static str) -> DecodeResult<String> {
    match message.property(name)? {
        None => Err(DecodeError::MissingProperty { name }),
        Some(value) => match value.as_str() {
            Some(s) => Ok(s.to_string()),
            None => Err(DecodeError::NotAString {
                name,
                found: value.type_name(),
            }),
        },
    }
}

fn resource_path(name: &'static str, value: &str) -> DecodeResult<ResourcePath> {
    let path = ResourcePath::parse(value).map_err(|source| DecodeError::InvalidPath { name, source })?;
    if path.is_root() {
        return Err(DecodeError::RootPath { name });
    }
    Ok(path)
}
