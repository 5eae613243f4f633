//! # docrepl Protocol
//!
//! Change-event types and message decoding for docrepl.
//!
//! This crate provides:
//! - `ResourceType` and `ResourceOperation`
//! - `Metadata` with typed `PropertyValue`s
//! - `Envelope`, one decoded change event
//! - `TransportMessage`, the view of a raw inbound message
//! - `Decoder` for turning messages into envelopes
//!
//! This is a pure protocol crate: decoding never touches a store.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod envelope;
mod error;
mod metadata;
mod resource;
mod transport;

pub use decoder::{
    Decoder, DecoderConfig, DESTINATION_PATH, RESOURCE_OPERATION, RESOURCE_TYPE, SOURCE_PATH,
};
pub use envelope::Envelope;
pub use error::{DecodeError, DecodeResult};
pub use metadata::{Metadata, PropertyValue};
pub use resource::{ParseEnumError, ResourceOperation, ResourceType};
pub use transport::{InboundMessage, TransportError, TransportMessage};
