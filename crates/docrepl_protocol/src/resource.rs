//! Resource types and operations carried by change events.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A header value that is not part of its enum domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {domain} '{value}'")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub domain: &'static str,
    /// The rejected value.
    pub value: String,
}

/// Kind of resource a change event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// An XML or binary document.
    Document,
    /// A collection of documents and sub-collections.
    Collection,
}

impl ResourceType {
    /// All resource types.
    pub const ALL: [ResourceType; 2] = [ResourceType::Document, ResourceType::Collection];

    /// The wire name, e.g. `DOCUMENT`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "DOCUMENT",
            ResourceType::Collection => "COLLECTION",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ParseEnumError;

    /// Parses a wire name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                domain: "resource type",
                value: s.to_string(),
            })
    }
}

/// Change applied to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// Resource was created.
    Create,
    /// Resource content was replaced.
    Update,
    /// Resource was removed.
    Delete,
    /// Resource was moved to the destination path.
    Move,
    /// Resource was copied to the destination path.
    Copy,
    /// Resource owner, group, mode or MIME type changed.
    Metadata,
}

impl ResourceOperation {
    /// All operations.
    pub const ALL: [ResourceOperation; 6] = [
        ResourceOperation::Create,
        ResourceOperation::Update,
        ResourceOperation::Delete,
        ResourceOperation::Move,
        ResourceOperation::Copy,
        ResourceOperation::Metadata,
    ];

    /// The wire name, e.g. `CREATE`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceOperation::Create => "CREATE",
            ResourceOperation::Update => "UPDATE",
            ResourceOperation::Delete => "DELETE",
            ResourceOperation::Move => "MOVE",
            ResourceOperation::Copy => "COPY",
            ResourceOperation::Metadata => "METADATA",
        }
    }

    /// Returns true for operations that carry a destination path.
    #[must_use]
    pub const fn requires_destination(&self) -> bool {
        matches!(self, ResourceOperation::Move | ResourceOperation::Copy)
    }
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceOperation {
    type Err = ParseEnumError;

    /// Parses a wire name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                domain: "resource operation",
                value: s.to_string(),
            })
    }
}
