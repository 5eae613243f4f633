//! Handlers for collection events.

use crate::error::{ReplicationError, ReplicationResult};
use crate::replicator::{destination, split, Replicator};
use crate::scope::{transactional, Outcome};
use docrepl_protocol::Envelope;
use docrepl_store::{StoreError, Subject};
use tracing::info;

impl Replicator {
    /// Creates the collection at the source path, with any missing
    /// ancestors, and applies owner, group and mode from the metadata.
    ///
    /// # Errors
    ///
    /// Fails with `PermissionResolution` before any transaction begins, and
    /// with `Conflict` if the collection already exists.
    pub fn create_or_update_collection(
        &self,
        envelope: &Envelope,
        subject: &Subject,
    ) -> ReplicationResult<()> {
        let path = &envelope.source_path;
        let permissions = self.resolve_permissions(&envelope.metadata)?;

        transactional(self.store(), subject, |scope| {
            if scope.lock(path)?.is_some() {
                return Err(ReplicationError::Conflict(format!(
                    "collection {path} already exists"
                )));
            }

            let store = scope.store();
            let txn = scope.txn();
            // A concurrent apply may have created it since the check above.
            store.create_collection(txn, path).map_err(|e| match e {
                StoreError::CollectionExists { .. } => {
                    ReplicationError::Conflict(format!("collection {path} already exists"))
                }
                e => e.into(),
            })?;

            let collection = scope.lock_existing(path)?;
            if !permissions.is_empty() {
                store.set_collection_permissions(txn, &collection, &permissions)?;
            }
            store.save_collection(txn, &collection)?;

            info!(%txn, %path, "created collection");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }

    /// Removes the collection at the source path with everything below it.
    ///
    /// A missing collection is not an error: the transaction is rolled back
    /// and the call succeeds.
    ///
    /// # Errors
    ///
    /// Fails with `Apply` if the store refuses the removal.
    pub fn delete_collection(&self, envelope: &Envelope, subject: &Subject) -> ReplicationResult<()> {
        let path = &envelope.source_path;

        transactional(self.store(), subject, |scope| {
            let Some(collection) = scope.lock(path)? else {
                info!(%path, "collection does not exist, nothing to delete");
                return Ok(Outcome::Rollback);
            };

            scope.store().remove_collection(scope.txn(), &collection)?;
            info!(txn = %scope.txn(), %path, "removed collection");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }

    /// Moves or copies the collection at the source path, with everything
    /// below it, to the destination path.
    ///
    /// The source collection is locked before the destination's parent.
    ///
    /// # Errors
    ///
    /// Fails with `ResourceNotFound` if the source collection or the
    /// destination's parent is missing, and with `Apply` if the store refuses
    /// the relocation (for example a target inside the source).
    pub fn relocate_collection(
        &self,
        envelope: &Envelope,
        subject: &Subject,
        keep_source: bool,
    ) -> ReplicationResult<()> {
        let source = &envelope.source_path;
        let target = destination(envelope)?;
        let (target_parent, target_name) = split(target)?;

        transactional(self.store(), subject, |scope| {
            let source_collection = scope.lock_existing(source)?;
            let target_collection = scope.lock_existing(&target_parent)?;

            let store = scope.store();
            let txn = scope.txn();
            if keep_source {
                store.copy_collection(txn, &source_collection, &target_collection, target_name)?;
            } else {
                store.move_collection(txn, &source_collection, &target_collection, target_name)?;
            }

            info!(%txn, from = %source, to = %target, keep_source, "relocated collection");
            Ok(Outcome::Commit)
        })?;
        Ok(())
    }
}
