//! Handlers for document events.

use crate::compression::maybe_decompress;
use crate::error::{ReplicationError, ReplicationResult};
use crate::replicator::{destination, split, Replicator};
use crate::scope::{transactional, Outcome};
use docrepl_protocol::Envelope;
use docrepl_store::{DocumentKind, Subject};
use tracing::info;

impl Replicator {
    /// Stores the payload as the document at the source path, replacing any
    /// existing document of that name.
    ///
    /// The payload is gunzipped when compressed. XML content is validated
    /// before it is stored; binary content is stored as is. Owner, group and
    /// mode from the metadata are applied to the stored document.
    ///
    /// # Errors
    ///
    /// Fails with `MimeResolution` or `PermissionResolution` before any
    /// transaction begins, with `ResourceNotFound` if the parent collection
    /// is missing, and with `Apply` if decompression or the store fails.
    pub fn create_or_update_document(
        &self,
        envelope: &Envelope,
        subject: &Subject,
    ) -> ReplicationResult<()> {
        let path = &envelope.source_path;
        let (parent, name) = split(path)?;
        let (kind, mime_type) = self.resolve_content_type(path, name, &envelope.metadata)?;
        let permissions = self.resolve_permissions(&envelope.metadata)?;

        let payload = envelope.payload.as_deref().unwrap_or_default();
        let content = maybe_decompress(payload, self.config().max_decompressed_bytes)?;

        transactional(self.store(), subject, |scope| {
            let collection = scope.lock_existing(&parent)?;
            let store = scope.store();
            let txn = scope.txn();

            let document = match kind {
                DocumentKind::Xml => {
                    let mut staged =
                        store.validate_xml_resource(txn, &collection, name, &mut content.as_slice())?;
                    staged.mime_type.clone_from(&mime_type);
                    store.store_xml_resource(txn, &staged, &mut content.as_slice())?
                }
                DocumentKind::Binary => store.add_binary_resource(
                    txn,
                    &collection,
                    name,
                    &mut content.as_slice(),
                    &mime_type,
                    content.len() as u64,
                )?,
            };

            if !permissions.is_empty() {
                store.set_document_permissions(txn, &document, &permissions)?;
            }

            info!(%txn, %path, %kind, %mime_type, length = content.len(), "stored document");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }

    /// Applies the owner, group, mode and MIME type changes carried in the
    /// metadata to an existing document.
    ///
    /// # Errors
    ///
    /// Fails with `PermissionResolution` or `MimeResolution` before any
    /// transaction begins, and with `ResourceNotFound` if the collection or
    /// the document is missing.
    pub fn update_document_metadata(
        &self,
        envelope: &Envelope,
        subject: &Subject,
    ) -> ReplicationResult<()> {
        let path = &envelope.source_path;
        let (parent, name) = split(path)?;
        let permissions = self.resolve_permissions(&envelope.metadata)?;
        let mime_type = match envelope.metadata.mime_type() {
            None => None,
            Some(_) => Some(self.mime_override(&envelope.metadata).ok_or_else(|| {
                ReplicationError::MimeResolution {
                    path: path.to_string(),
                }
            })?),
        };

        transactional(self.store(), subject, |scope| {
            let collection = scope.lock_existing(&parent)?;
            let store = scope.store();
            let txn = scope.txn();

            let document = store
                .get_document(txn, &collection, name)?
                .ok_or_else(|| ReplicationError::document_not_found(path))?;

            if !permissions.is_empty() {
                store.set_document_permissions(txn, &document, &permissions)?;
            }
            if let Some(mime_type) = &mime_type {
                store.set_document_mime_type(txn, &document, mime_type)?;
            }

            info!(%txn, %path, ?permissions, ?mime_type, "updated document metadata");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }

    /// Removes the document at the source path.
    ///
    /// # Errors
    ///
    /// Fails with `ResourceNotFound` if the collection or the document is
    /// missing.
    pub fn delete_document(&self, envelope: &Envelope, subject: &Subject) -> ReplicationResult<()> {
        let path = &envelope.source_path;
        let (parent, name) = split(path)?;

        transactional(self.store(), subject, |scope| {
            let collection = scope.lock_existing(&parent)?;
            let store = scope.store();
            let txn = scope.txn();

            let document = store
                .get_document(txn, &collection, name)?
                .ok_or_else(|| ReplicationError::document_not_found(path))?;

            match document.kind {
                DocumentKind::Xml => store.remove_xml_resource(txn, &collection, name)?,
                DocumentKind::Binary => store.remove_binary_resource(txn, &collection, name)?,
            }

            info!(%txn, %path, kind = %document.kind, "removed document");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }

    /// Moves or copies the document at the source path to the destination
    /// path.
    ///
    /// The source collection is locked before the destination collection.
    ///
    /// # Errors
    ///
    /// Fails with `ResourceNotFound` if either collection or the source
    /// document is missing.
    pub fn relocate_document(
        &self,
        envelope: &Envelope,
        subject: &Subject,
        keep_source: bool,
    ) -> ReplicationResult<()> {
        let source = &envelope.source_path;
        let target = destination(envelope)?;
        let (source_parent, source_name) = split(source)?;
        let (target_parent, target_name) = split(target)?;

        transactional(self.store(), subject, |scope| {
            let source_collection = scope.lock_existing(&source_parent)?;
            let document = scope
                .store()
                .get_document(scope.txn(), &source_collection, source_name)?
                .ok_or_else(|| ReplicationError::document_not_found(source))?;
            let target_collection = scope.lock_existing(&target_parent)?;

            let store = scope.store();
            let txn = scope.txn();
            if keep_source {
                store.copy_resource(txn, &document, &target_collection, target_name)?;
            } else {
                store.move_resource(txn, &document, &target_collection, target_name)?;
            }

            info!(%txn, from = %source, to = %target, keep_source, "relocated document");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::compression::compress;
    use crate::error::ErrorKind;
    use crate::{ApplyConfig, Replicator};
    use docrepl_protocol::{Envelope, Metadata, ResourceOperation, ResourceType};
    use docrepl_store::{
        DefaultMimeTable, DocumentKind, MemorySecurityManager, MemoryStore, ResourcePath, Subject,
    };
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, Replicator) {
        let store = Arc::new(MemoryStore::new());
        let security = MemorySecurityManager::new();
        security.add_account("admin", "dba");
        security.add_group("editors");
        let replicator = Replicator::new(
            store.clone(),
            Arc::new(security),
            Arc::new(DefaultMimeTable::new()),
            ApplyConfig::default(),
        );
        (store, replicator)
    }

    fn document(operation: ResourceOperation, path: &str) -> Envelope {
        Envelope::new(ResourceType::Document, operation, ResourcePath::parse(path).unwrap())
    }

    fn assert_no_leaks(store: &MemoryStore) {
        assert_eq!(store.held_locks(), 0);
        assert_eq!(store.open_transactions(), 0);
        assert_eq!(store.active_brokers(), 0);
    }

    #[test]
    fn create_xml_from_gzip_payload_with_permissions() {
        let (store, replicator) = setup();
        let envelope = document(ResourceOperation::Create, "/db/site.xml")
            .with_payload(compress(b"<site><page/></site>").unwrap())
            .with_metadata(Metadata::OWNER, "admin")
            .with_metadata(Metadata::GROUP, "editors")
            .with_metadata(Metadata::MODE, 0o640_i64);

        replicator.apply(&envelope, &Subject::system()).unwrap();

        let stored = store.document("/db/site.xml").unwrap();
        assert_eq!(stored.kind, DocumentKind::Xml);
        assert_eq!(stored.content, "<site><page/></site>");
        assert_eq!(stored.permission.to_string(), "admin:editors 0640");
        assert_no_leaks(&store);
    }

    #[test]
    fn create_binary_uses_decompressed_length() {
        let (store, replicator) = setup();
        let content = vec![7u8; 4096];
        let envelope = document(ResourceOperation::Create, "/db/logo.png")
            .with_payload(compress(&content).unwrap());

        replicator.apply(&envelope, &Subject::system()).unwrap();

        let stored = store.document("/db/logo.png").unwrap();
        assert_eq!(stored.kind, DocumentKind::Binary);
        assert_eq!(stored.mime_type, "image/png");
        assert_eq!(stored.content.len(), 4096);
        assert_eq!(stored.permission.to_string(), "SYSTEM:dba 0644");
    }

    #[test]
    fn malformed_xml_leaves_store_unchanged() {
        let (store, replicator) = setup();
        let before = store.snapshot();
        let envelope =
            document(ResourceOperation::Create, "/db/broken.xml").with_payload(&b"<open>"[..]);

        let err = replicator.apply(&envelope, &Subject::system()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Apply);
        assert_eq!(store.snapshot(), before);
        assert_no_leaks(&store);
    }

    #[test]
    fn missing_parent_is_not_found() {
        let (store, replicator) = setup();
        let envelope = document(ResourceOperation::Update, "/db/nowhere/a.xml").with_payload(&b"<a/>"[..]);

        let err = replicator.apply(&envelope, &Subject::system()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_no_leaks(&store);
    }

    #[test]
    fn unknown_owner_fails_before_any_transaction() {
        let (store, replicator) = setup();
        let envelope = document(ResourceOperation::Create, "/db/a.xml")
            .with_payload(&b"<a/>"[..])
            .with_metadata(Metadata::OWNER, "ghost");

        let err = replicator.apply(&envelope, &Subject::system()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionResolution);
        assert!(store.document("/db/a.xml").is_none());
    }

    #[test]
    fn metadata_update_changes_existing_document() {
        let (store, replicator) = setup();
        replicator
            .apply(
                &document(ResourceOperation::Create, "/db/a.xml").with_payload(&b"<a/>"[..]),
                &Subject::system(),
            )
            .unwrap();

        let envelope = document(ResourceOperation::Metadata, "/db/a.xml")
            .with_metadata(Metadata::OWNER, "admin")
            .with_metadata(Metadata::MODE, 0o600_i64)
            .with_metadata(Metadata::MIME_TYPE, "text/xml");
        replicator.apply(&envelope, &Subject::system()).unwrap();

        let stored = store.document("/db/a.xml").unwrap();
        assert_eq!(stored.permission.to_string(), "admin:dba 0600");
        assert_eq!(stored.mime_type, "text/xml");
        assert_eq!(stored.content, "<a/>");
    }

    #[test]
    fn metadata_update_of_missing_document_is_not_found() {
        let (store, replicator) = setup();
        let envelope =
            document(ResourceOperation::Metadata, "/db/missing.xml").with_metadata(Metadata::MODE, 0o600_i64);

        let err = replicator.apply(&envelope, &Subject::system()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_no_leaks(&store);
    }

    #[test]
    fn delete_removes_by_stored_kind() {
        let (store, replicator) = setup();
        for path in ["/db/a.xml", "/db/b.txt"] {
            let payload: &'static [u8] = if path.ends_with(".xml") { b"<a/>" } else { b"text" };
            replicator
                .apply(
                    &document(ResourceOperation::Create, path).with_payload(payload),
                    &Subject::system(),
                )
                .unwrap();
        }

        for path in ["/db/a.xml", "/db/b.txt"] {
            replicator
                .apply(&document(ResourceOperation::Delete, path), &Subject::system())
                .unwrap();
            assert!(store.document(path).is_none());
        }

        let err = replicator
            .apply(&document(ResourceOperation::Delete, "/db/a.xml"), &Subject::system())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_no_leaks(&store);
    }

    #[test]
    fn move_and_copy_within_one_collection() {
        let (store, replicator) = setup();
        replicator
            .apply(
                &document(ResourceOperation::Create, "/db/a.xml").with_payload(&b"<a/>"[..]),
                &Subject::system(),
            )
            .unwrap();

        let copy = document(ResourceOperation::Copy, "/db/a.xml")
            .with_destination(ResourcePath::parse("/db/b.xml").unwrap());
        replicator.apply(&copy, &Subject::system()).unwrap();
        assert_eq!(store.document("/db/a.xml"), store.document("/db/b.xml"));

        let rename = document(ResourceOperation::Move, "/db/b.xml")
            .with_destination(ResourcePath::parse("/db/c.xml").unwrap());
        replicator.apply(&rename, &Subject::system()).unwrap();
        assert!(store.document("/db/b.xml").is_none());
        assert_eq!(store.document("/db/c.xml").unwrap().content, "<a/>");
        assert_no_leaks(&store);
    }
}
