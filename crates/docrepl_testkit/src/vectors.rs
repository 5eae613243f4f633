//! Inbound message test vectors.
//!
//! Vectors are kept as JSON so that producers in other languages can check
//! their messages against the same expectations.

use docrepl_apply::compression::compress;
use docrepl_protocol::{InboundMessage, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MESSAGES_JSON: &str = include_str!("../vectors/messages.json");

/// One inbound message and the outcome of applying it.
///
/// Vectors expect a replica seeded with the `/db/site` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Message properties.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Body text, if any.
    pub body: Option<String>,
    /// Whether the body is sent gzip-compressed.
    pub gzip: bool,
    /// Expected error kind name (if this should fail).
    pub expected_error: Option<String>,
}

impl MessageVector {
    /// Builds the inbound message described by the vector.
    pub fn to_message(&self) -> InboundMessage {
        let mut message = self
            .properties
            .iter()
            .fold(InboundMessage::new(), |message, (name, value)| {
                message.with_property(name.clone(), value.clone())
            });

        if let Some(body) = &self.body {
            let bytes = if self.gzip {
                compress(body.as_bytes()).expect("gzip in memory")
            } else {
                body.as_bytes().to_vec()
            };
            message = message.with_body(bytes);
        }
        message
    }
}

/// All inbound message vectors.
pub fn message_vectors() -> Vec<MessageVector> {
    serde_json::from_str(MESSAGES_JSON).expect("message vectors are valid JSON")
}

/// Compresses `data` with gzip.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    compress(data).expect("gzip in memory")
}
