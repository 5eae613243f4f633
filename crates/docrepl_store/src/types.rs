//! Identifiers, permissions and resource handles shared by every store.

use crate::path::ResourcePath;
use std::fmt;

/// Identifier of a transaction.
///
/// Transaction IDs are monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(pub u64);

impl TxnId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Identifier of a pooled broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrokerId(pub u64);

impl BrokerId {
    /// Creates a new broker ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BrokerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broker:{}", self.0)
    }
}

/// The identity a broker session acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Account name.
    pub name: String,
    /// Group memberships; the first one is the primary group.
    pub groups: Vec<String>,
}

impl Subject {
    /// Name of the built-in system account.
    pub const SYSTEM_ACCOUNT: &'static str = "SYSTEM";
    /// Name of the built-in administrators group.
    pub const DBA_GROUP: &'static str = "dba";

    /// Creates a subject with a primary group.
    pub fn new(name: impl Into<String>, primary_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: vec![primary_group.into()],
        }
    }

    /// The system identity replication applies changes as by default.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ACCOUNT, Self::DBA_GROUP)
    }

    /// The primary group, if the subject has one.
    #[must_use]
    pub fn primary_group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }
}

/// Owner, group and mode bits of a collection or document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    /// Owning account.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Unix-style mode bits, e.g. `0o644`.
    pub mode: u32,
}

impl Permission {
    /// Highest valid mode value (setuid/setgid/sticky plus rwx triplets).
    pub const MAX_MODE: u32 = 0o7777;

    /// Applies the fields present in `update`.
    pub fn apply(&mut self, update: &PermissionUpdate) {
        if let Some(owner) = &update.owner {
            self.owner.clone_from(owner);
        }
        if let Some(group) = &update.group {
            self.group.clone_from(group);
        }
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {:04o}", self.owner, self.group, self.mode)
    }
}

/// A partial permission change; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionUpdate {
    /// New owner.
    pub owner: Option<String>,
    /// New group.
    pub group: Option<String>,
    /// New mode bits.
    pub mode: Option<u32>,
}

impl PermissionUpdate {
    /// Returns true if the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.group.is_none() && self.mode.is_none()
    }
}

/// How a document's content is held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Parsed and validated XML.
    Xml,
    /// Opaque bytes.
    Binary,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Xml => f.write_str("xml"),
            DocumentKind::Binary => f.write_str("binary"),
        }
    }
}

/// A collection opened by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    /// Path of the collection.
    pub path: ResourcePath,
}

/// A document resolved inside a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// Path of the containing collection.
    pub collection: ResourcePath,
    /// Document name within the collection.
    pub name: String,
    /// Stored content kind.
    pub kind: DocumentKind,
    /// Stored MIME type.
    pub mime_type: String,
}

impl DocumentHandle {
    /// Full path of the document.
    #[must_use]
    pub fn path(&self) -> ResourcePath {
        self.collection.join(&self.name)
    }
}

/// The result of validating XML content before it is stored.
///
/// Produced by [`crate::ReplicaStore::validate_xml_resource`] and consumed by
/// [`crate::ReplicaStore::store_xml_resource`], which only accepts content
/// whose digest matches the validated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    /// Path of the target collection.
    pub collection: ResourcePath,
    /// Document name within the collection.
    pub name: String,
    /// MIME type the document will be stored with.
    pub mime_type: String,
    /// SHA-256 digest of the validated content.
    pub digest: [u8; 32],
    /// Length of the validated content in bytes.
    pub length: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txn_id_ordering_and_display() {
        assert!(TxnId::new(1) < TxnId::new(2));
        assert_eq!(TxnId::new(7).to_string(), "txn:7");
    }

    #[test]
    fn permission_update_applies_present_fields() {
        let mut permission = Permission {
            owner: "admin".into(),
            group: "dba".into(),
            mode: 0o644,
        };

        permission.apply(&PermissionUpdate {
            owner: None,
            group: Some("editors".into()),
            mode: Some(0o660),
        });

        assert_eq!(permission.owner, "admin");
        assert_eq!(permission.group, "editors");
        assert_eq!(permission.to_string(), "admin:editors 0660");
    }

    #[test]
    fn system_subject() {
        let subject = Subject::system();
        assert_eq!(subject.name, "SYSTEM");
        assert_eq!(subject.primary_group(), Some("dba"));
        assert!(PermissionUpdate::default().is_empty());
    }
}
