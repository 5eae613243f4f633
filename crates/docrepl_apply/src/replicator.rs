//! The replicator: dispatch plus the resolution steps shared by handlers.

use crate::config::ApplyConfig;
use crate::dispatch::{route, Route};
use crate::error::{ReplicationError, ReplicationResult};
use docrepl_protocol::{DecodeError, Envelope, Metadata, PropertyValue, DESTINATION_PATH};
use docrepl_store::{
    DocumentKind, MimeTable, Permission, PermissionUpdate, ReplicaStore, ResourcePath,
    SecurityManager, Subject,
};
use std::sync::Arc;
use tracing::{error, Level};

/// Applies decoded change events to a replica store.
///
/// A `Replicator` holds no per-message state; [`Replicator::apply`] may be
/// called from any number of threads at once, each call coordinating with
/// the others only through the store's collection locks.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use docrepl_apply::{ApplyConfig, Replicator};
/// use docrepl_protocol::{Envelope, ResourceOperation, ResourceType};
/// use docrepl_store::{DefaultMimeTable, MemorySecurityManager, MemoryStore, ResourcePath, Subject};
///
/// let store = Arc::new(MemoryStore::new());
/// let replicator = Replicator::new(
///     store.clone(),
///     Arc::new(MemorySecurityManager::new()),
///     Arc::new(DefaultMimeTable::new()),
///     ApplyConfig::default(),
/// );
///
/// let envelope = Envelope::new(
///     ResourceType::Collection,
///     ResourceOperation::Create,
///     ResourcePath::parse("/db/apps").unwrap(),
/// );
/// replicator.apply(&envelope, &Subject::system()).unwrap();
/// assert!(store.collection("/db/apps").is_some());
/// ```
pub struct Replicator {
    store: Arc<dyn ReplicaStore>,
    security: Arc<dyn SecurityManager>,
    mime: Arc<dyn MimeTable>,
    config: ApplyConfig,
}

impl Replicator {
    /// Creates a replicator over the given collaborators.
    pub fn new(
        store: Arc<dyn ReplicaStore>,
        security: Arc<dyn SecurityManager>,
        mime: Arc<dyn MimeTable>,
        config: ApplyConfig,
    ) -> Self {
        Self {
            store,
            security,
            mime,
            config,
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn ReplicaStore {
        self.store.as_ref()
    }

    /// Applies one change event as `subject`.
    ///
    /// Failures are logged, with the full error chain and the envelope
    /// report when DEBUG is enabled, and returned unchanged.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` for pairs outside the dispatch
    /// table, or with the error of the handler.
    pub fn apply(&self, envelope: &Envelope, subject: &Subject) -> ReplicationResult<()> {
        let result = match route(envelope.resource_type, envelope.operation) {
            None => Err(ReplicationError::UnsupportedOperation {
                resource_type: envelope.resource_type,
                operation: envelope.operation,
            }),
            Some(Route::CreateOrUpdateDocument) => self.create_or_update_document(envelope, subject),
            Some(Route::UpdateDocumentMetadata) => self.update_document_metadata(envelope, subject),
            Some(Route::DeleteDocument) => self.delete_document(envelope, subject),
            Some(Route::RelocateDocument { keep_source }) => {
                self.relocate_document(envelope, subject, keep_source)
            }
            Some(Route::CreateOrUpdateCollection) => {
                self.create_or_update_collection(envelope, subject)
            }
            Some(Route::DeleteCollection) => self.delete_collection(envelope, subject),
            Some(Route::RelocateCollection { keep_source }) => {
                self.relocate_collection(envelope, subject, keep_source)
            }
        };

        if let Err(e) = &result {
            log_failure(e, Some(envelope));
        }
        result
    }

    /// Builds the subject for an existing account.
    ///
    /// # Errors
    ///
    /// Fails with `PermissionResolution` if the account does not exist.
    pub fn subject_for(&self, account: &str) -> ReplicationResult<Subject> {
        let account = self
            .security
            .account(account)
            .ok_or_else(|| ReplicationError::permission(format!("account {account} does not exist")))?;
        Ok(Subject::new(account.name, account.primary_group))
    }

    /// Resolves the owner, group and mode carried in `metadata`.
    ///
    /// Absent properties are left out of the update. A present owner or
    /// group must name an existing account or group, and a present mode must
    /// be an integer within the mode bit range.
    pub(crate) fn resolve_permissions(&self, metadata: &Metadata) -> ReplicationResult<PermissionUpdate> {
        let owner = match metadata.owner() {
            None => None,
            Some(value) => {
                let name = expect_string("owner", value)?;
                let account = self
                    .security
                    .account(name)
                    .ok_or_else(|| ReplicationError::permission(format!("account {name} does not exist")))?;
                Some(account.name)
            }
        };

        let group = match metadata.group() {
            None => None,
            Some(value) => {
                let name = expect_string("group", value)?;
                let group = self
                    .security
                    .group(name)
                    .ok_or_else(|| ReplicationError::permission(format!("group {name} does not exist")))?;
                Some(group.name)
            }
        };

        let mode = match metadata.mode() {
            None => None,
            Some(value) => {
                let raw = value.as_int().ok_or_else(|| {
                    ReplicationError::permission(format!("mode must be an integer, got {}", value.type_name()))
                })?;
                let mode = u32::try_from(raw)
                    .ok()
                    .filter(|mode| *mode <= Permission::MAX_MODE)
                    .ok_or_else(|| ReplicationError::permission(format!("mode {raw} is out of range")))?;
                Some(mode)
            }
        };

        Ok(PermissionUpdate { owner, group, mode })
    }

    /// Resolves how a document is stored and which MIME type it gets.
    ///
    /// The storage kind follows the document name; the MIME name follows the
    /// metadata override when it resolves, and the full path otherwise.
    pub(crate) fn resolve_content_type(
        &self,
        path: &ResourcePath,
        name: &str,
        metadata: &Metadata,
    ) -> ReplicationResult<(DocumentKind, String)> {
        let kind = self
            .mime
            .content_type_for(name)
            .map_or(DocumentKind::Binary, |mime| mime.kind);

        let mime_type = self
            .mime_override(metadata)
            .or_else(|| self.mime.content_type_for(&path.to_string()).map(|mime| mime.name))
            .ok_or_else(|| ReplicationError::MimeResolution {
                path: path.to_string(),
            })?;

        Ok((kind, mime_type))
    }

    /// The MIME name of the metadata override, if it is a known type.
    pub(crate) fn mime_override(&self, metadata: &Metadata) -> Option<String> {
        metadata
            .mime_type()
            .and_then(PropertyValue::as_str)
            .and_then(|name| self.mime.content_type_for(name))
            .map(|mime| mime.name)
    }
}

/// Splits a resource path into its parent collection and leaf name.
pub(crate) fn split(path: &ResourcePath) -> ReplicationResult<(ResourcePath, &str)> {
    path.split()
        .ok_or_else(|| ReplicationError::collection_not_found(path))
}

/// The destination of a move or copy.
pub(crate) fn destination(envelope: &Envelope) -> ReplicationResult<&ResourcePath> {
    envelope.destination_path.as_ref().ok_or_else(|| {
        ReplicationError::Decode(DecodeError::MissingProperty {
            name: DESTINATION_PATH,
        })
    })
}

fn expect_string<'v>(what: &str, value: &'v PropertyValue) -> ReplicationResult<&'v str> {
    value.as_str().ok_or_else(|| {
        ReplicationError::permission(format!("{what} must be a string, got {}", value.type_name()))
    })
}

pub(crate) fn log_failure(err: &ReplicationError, envelope: Option<&Envelope>) {
    let report = envelope.map(Envelope::report).unwrap_or_default();
    if tracing::enabled!(Level::DEBUG) {
        error!(kind = %err.kind(), error = ?err, %report, "failed to apply change");
    } else {
        error!(kind = %err.kind(), "failed to apply change: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use docrepl_protocol::{ResourceOperation, ResourceType};
    use docrepl_store::{DefaultMimeTable, MemorySecurityManager, MemoryStore};

    fn replicator() -> Replicator {
        let security = MemorySecurityManager::new();
        security.add_account("admin", "dba");
        security.add_group("editors");
        Replicator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(security),
            Arc::new(DefaultMimeTable::new()),
            ApplyConfig::default(),
        )
    }

    fn path(p: &str) -> ResourcePath {
        ResourcePath::parse(p).unwrap()
    }

    #[test]
    fn permissions_resolve_present_fields_only() {
        let metadata: Metadata = [
            (Metadata::OWNER, PropertyValue::from("admin")),
            (Metadata::MODE, PropertyValue::from(0o640_i64)),
        ]
        .into_iter()
        .collect();

        let update = replicator().resolve_permissions(&metadata).unwrap();
        assert_eq!(update.owner.as_deref(), Some("admin"));
        assert!(update.group.is_none());
        assert_eq!(update.mode, Some(0o640));
        assert!(replicator().resolve_permissions(&Metadata::new()).unwrap().is_empty());
    }

    #[test]
    fn unknown_or_invalid_permissions_fail() {
        let r = replicator();
        let cases = [
            (Metadata::OWNER, PropertyValue::from("nobody")),
            (Metadata::GROUP, PropertyValue::from("nogroup")),
            (Metadata::OWNER, PropertyValue::from(5_i64)),
            (Metadata::MODE, PropertyValue::from("0644")),
            (Metadata::MODE, PropertyValue::from(0o10000_i64)),
            (Metadata::MODE, PropertyValue::from(-1_i64)),
        ];

        for (key, value) in cases {
            let metadata: Metadata = [(key, value.clone())].into_iter().collect();
            let err = r.resolve_permissions(&metadata).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionResolution, "{key}={value}");
        }
    }

    #[test]
    fn content_type_kind_follows_name_and_mime_follows_override() {
        let r = replicator();
        let metadata: Metadata = [(Metadata::MIME_TYPE, "text/xml")].into_iter().collect();

        let (kind, mime) = r
            .resolve_content_type(&path("/db/a.xml"), "a.xml", &Metadata::new())
            .unwrap();
        assert_eq!(kind, DocumentKind::Xml);
        assert_eq!(mime, "application/xml");

        let (kind, mime) = r
            .resolve_content_type(&path("/db/a.xml"), "a.xml", &metadata)
            .unwrap();
        assert_eq!(kind, DocumentKind::Xml);
        assert_eq!(mime, "text/xml");

        let (kind, _) = r
            .resolve_content_type(&path("/db/logo.png"), "logo.png", &Metadata::new())
            .unwrap();
        assert_eq!(kind, DocumentKind::Binary);
    }

    #[test]
    fn unresolvable_mime_type_fails() {
        let err = replicator()
            .resolve_content_type(&path("/db/README"), "README", &Metadata::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MimeResolution);
    }

    #[test]
    fn unsupported_pair_is_rejected() {
        let envelope = Envelope::new(
            ResourceType::Collection,
            ResourceOperation::Metadata,
            path("/db/a"),
        );
        let err = replicator().apply(&envelope, &Subject::system()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn subject_for_known_account() {
        let subject = replicator().subject_for("admin").unwrap();
        assert_eq!(subject.name, "admin");
        assert_eq!(subject.primary_group(), Some("dba"));
        assert!(replicator().subject_for("ghost").is_err());
    }
}
