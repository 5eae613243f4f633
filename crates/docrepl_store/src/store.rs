//! The replica store contract consumed by the apply path.

use crate::error::StoreResult;
use crate::path::ResourcePath;
use crate::types::{
    BrokerId, CollectionHandle, DocumentHandle, PermissionUpdate, StagedDocument, Subject, TxnId,
};
use std::io::Read;

/// A hierarchical document store that replicated changes are applied to.
///
/// The store owns sessions, transactions and collection locks; callers only
/// hold opaque identifiers and handles. Every mutation names the
/// transaction it belongs to.
///
/// # Invariants
///
/// - Every `acquire_broker` is matched by exactly one `release_broker`
/// - Every `begin_transaction` is matched by exactly one `close`, after
///   either `commit` or `abort`
/// - `close` on a transaction that was neither committed nor aborted rolls
///   it back
/// - Collection write locks are re-entrant per transaction: every
///   successful `open_collection_write` is matched by one
///   `release_collection`
/// - An aborted transaction leaves no trace in the namespace
///
/// Implementations must be `Send + Sync`; handlers run concurrently and
/// coordinate only through collection locks.
pub trait ReplicaStore: Send + Sync {
    /// Takes a session from the broker pool, acting as `subject`.
    ///
    /// # Errors
    ///
    /// Fails if no broker becomes available.
    fn acquire_broker(&self, subject: &Subject) -> StoreResult<BrokerId>;

    /// Returns a session to the pool.
    fn release_broker(&self, broker: BrokerId);

    /// Begins a transaction on a broker session.
    ///
    /// # Errors
    ///
    /// Fails if the broker is unknown.
    fn begin_transaction(&self, broker: BrokerId) -> StoreResult<TxnId>;

    /// Makes all changes of the transaction permanent.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is unknown or no longer active.
    fn commit(&self, txn: TxnId) -> StoreResult<()>;

    /// Discards all changes of the transaction.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is unknown or no longer active.
    fn abort(&self, txn: TxnId) -> StoreResult<()>;

    /// Releases the transaction handle.
    fn close(&self, txn: TxnId);

    /// Opens the collection at `path` holding a write lock.
    ///
    /// Returns `Ok(None)` (and holds no lock) if the collection does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Fails if the lock cannot be acquired or the transaction is not active.
    fn open_collection_write(
        &self,
        txn: TxnId,
        path: &ResourcePath,
    ) -> StoreResult<Option<CollectionHandle>>;

    /// Releases one write lock on a collection previously opened by `txn`.
    fn release_collection(&self, txn: TxnId, collection: &CollectionHandle);

    /// Creates the collection at `path`, including missing ancestors.
    ///
    /// The nearest existing ancestor and every created collection stay
    /// write-locked by `txn` until it is closed, so concurrent creations of
    /// one path are serialized.
    ///
    /// # Errors
    ///
    /// Fails with `CollectionExists` if the collection already exists, and
    /// if a document occupies the path.
    fn create_collection(&self, txn: TxnId, path: &ResourcePath) -> StoreResult<CollectionHandle>;

    /// Persists collection metadata changes.
    ///
    /// # Errors
    ///
    /// Fails if the collection no longer exists.
    fn save_collection(&self, txn: TxnId, collection: &CollectionHandle) -> StoreResult<()>;

    /// Removes a collection with all documents and sub-collections.
    ///
    /// Waits for the write lock of every sub-collection, which `txn` then
    /// holds until it is closed.
    ///
    /// # Errors
    ///
    /// Fails if the collection is the root or is not locked by `txn`, and
    /// with `LockTimeout` if another transaction keeps a sub-collection
    /// locked.
    fn remove_collection(&self, txn: TxnId, collection: &CollectionHandle) -> StoreResult<()>;

    /// Looks up a document by name.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is not active.
    fn get_document(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
    ) -> StoreResult<Option<DocumentHandle>>;

    /// Stores binary content, replacing any document with the same name.
    ///
    /// # Errors
    ///
    /// Fails if reading `content` fails or yields other than `length` bytes.
    fn add_binary_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
        content: &mut dyn Read,
        mime_type: &str,
        length: u64,
    ) -> StoreResult<DocumentHandle>;

    /// Validates XML content for storing under `name`.
    ///
    /// Nothing is written; the returned handle is passed to
    /// [`ReplicaStore::store_xml_resource`] together with the same content.
    ///
    /// # Errors
    ///
    /// Fails if the content is not well-formed.
    fn validate_xml_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
        source: &mut dyn Read,
    ) -> StoreResult<StagedDocument>;

    /// Stores previously validated XML content.
    ///
    /// # Errors
    ///
    /// Fails if `source` differs from the validated content.
    fn store_xml_resource(
        &self,
        txn: TxnId,
        staged: &StagedDocument,
        source: &mut dyn Read,
    ) -> StoreResult<DocumentHandle>;

    /// Removes a binary document.
    ///
    /// # Errors
    ///
    /// Fails if the document is missing or is XML.
    fn remove_binary_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
    ) -> StoreResult<()>;

    /// Removes an XML document.
    ///
    /// # Errors
    ///
    /// Fails if the document is missing or is binary.
    fn remove_xml_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
    ) -> StoreResult<()>;

    /// Copies a document into `destination` under `new_name`.
    ///
    /// # Errors
    ///
    /// Fails if the source vanished or the target name is taken by a
    /// collection.
    fn copy_resource(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()>;

    /// Moves a document into `destination` under `new_name`.
    ///
    /// # Errors
    ///
    /// Same as [`ReplicaStore::copy_resource`].
    fn move_resource(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()>;

    /// Copies a collection tree into `destination` under `new_name`.
    ///
    /// Every collection of the source tree and of the new tree stays
    /// write-locked by `txn` until it is closed.
    ///
    /// # Errors
    ///
    /// Fails if the target exists or lies inside the source, and with
    /// `LockTimeout` if another transaction keeps part of either tree locked.
    fn copy_collection(
        &self,
        txn: TxnId,
        source: &CollectionHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()>;

    /// Moves a collection tree into `destination` under `new_name`.
    ///
    /// # Errors
    ///
    /// Same as [`ReplicaStore::copy_collection`].
    fn move_collection(
        &self,
        txn: TxnId,
        source: &CollectionHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()>;

    /// Changes owner, group or mode of a collection.
    ///
    /// # Errors
    ///
    /// Fails if the collection is missing.
    fn set_collection_permissions(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        update: &PermissionUpdate,
    ) -> StoreResult<()>;

    /// Changes owner, group or mode of a document.
    ///
    /// # Errors
    ///
    /// Fails if the document is missing or its collection is not locked.
    fn set_document_permissions(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        update: &PermissionUpdate,
    ) -> StoreResult<()>;

    /// Changes the MIME type of a document.
    ///
    /// # Errors
    ///
    /// Fails if the document is missing or its collection is not locked.
    fn set_document_mime_type(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        mime_type: &str,
    ) -> StoreResult<()>;
}
