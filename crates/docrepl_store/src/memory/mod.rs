//! In-memory reference implementation of [`ReplicaStore`].

mod brokers;
mod locks;
mod namespace;
mod transaction;

pub use namespace::{CollectionEntry, Namespace, StoredDocument};
pub use transaction::TransactionState;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::path::ResourcePath;
use crate::store::ReplicaStore;
use crate::types::{
    BrokerId, CollectionHandle, DocumentHandle, DocumentKind, Permission, PermissionUpdate,
    StagedDocument, Subject, TxnId,
};
use crate::xml;
use brokers::BrokerPool;
use bytes::Bytes;
use locks::LockTable;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};
use transaction::{Mutation, TxnRecord};

#[derive(Debug, Default)]
struct StoreState {
    namespace: Namespace,
    transactions: HashMap<TxnId, TxnRecord>,
}

/// An in-memory replica store.
///
/// This store is suitable for:
/// - Unit and integration tests of the apply path
/// - Ephemeral replicas that don't need persistence
///
/// # Transactions
///
/// Mutations are applied to the namespace as they happen and recorded in a
/// per-transaction undo log; abort (or closing a transaction that was never
/// finished) restores the saved entries. Isolation comes from collection
/// write locks: every document and collection mutation requires the calling
/// transaction to hold the write lock of the collection it changes, and
/// fails with [`StoreError::LockNotHeld`] otherwise.
///
/// Operations that touch more than one collection lock the rest
/// themselves and keep those locks until the transaction is closed:
/// creating a collection locks its nearest existing ancestor and every
/// collection it creates, and removing, moving or copying a collection
/// locks the whole subtree and every collection it creates. No transaction
/// can therefore change or restore a collection another open transaction
/// has created, removed or relocated.
///
/// # Example
///
/// ```rust
/// use docrepl_store::{MemoryStore, ReplicaStore, ResourcePath, Subject};
///
/// let store = MemoryStore::new();
/// let broker = store.acquire_broker(&Subject::system()).unwrap();
/// let txn = store.begin_transaction(broker).unwrap();
///
/// let path = ResourcePath::parse("/db/apps").unwrap();
/// store.create_collection(txn, &path).unwrap();
/// store.commit(txn).unwrap();
/// store.close(txn);
/// store.release_broker(broker);
///
/// assert!(store.collection("/db/apps").is_some());
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    config: StoreConfig,
    root: ResourcePath,
    state: RwLock<StoreState>,
    locks: LockTable,
    brokers: BrokerPool,
    next_txid: AtomicU64,
}

impl MemoryStore {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store holding only the root collection.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        let root = ResourcePath::root().join(&config.root_collection);
        let system = Subject::system();

        let mut namespace = Namespace::default();
        namespace.replace(
            &root,
            Some(CollectionEntry::new(Permission {
                owner: system.name.clone(),
                group: Subject::DBA_GROUP.to_string(),
                mode: config.default_collection_mode,
            })),
        );

        Self {
            locks: LockTable::new(config.lock_timeout),
            brokers: BrokerPool::new(config.max_brokers, config.broker_timeout),
            root,
            state: RwLock::new(StoreState {
                namespace,
                transactions: HashMap::new(),
            }),
            next_txid: AtomicU64::new(1),
            config,
        }
    }

    /// The root collection path.
    #[must_use]
    pub fn root(&self) -> &ResourcePath {
        &self.root
    }

    /// Returns a copy of the whole namespace.
    #[must_use]
    pub fn snapshot(&self) -> Namespace {
        self.state.read().namespace.clone()
    }

    /// Returns the collection at `path`, if it exists.
    #[must_use]
    pub fn collection(&self, path: &str) -> Option<CollectionEntry> {
        let path = ResourcePath::parse(path).ok()?;
        self.state.read().namespace.collection(&path).cloned()
    }

    /// Returns the document at `path`, if it exists.
    #[must_use]
    pub fn document(&self, path: &str) -> Option<StoredDocument> {
        let path = ResourcePath::parse(path).ok()?;
        self.state.read().namespace.document(&path).cloned()
    }

    /// Number of collection paths currently write-locked.
    #[must_use]
    pub fn held_locks(&self) -> usize {
        self.locks.held_count()
    }

    /// Number of transactions begun but not yet closed.
    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.state.read().transactions.len()
    }

    /// Number of broker sessions currently taken from the pool.
    #[must_use]
    pub fn active_brokers(&self) -> usize {
        self.brokers.active_count()
    }

    fn read<T>(&self, txn: TxnId, f: impl FnOnce(&Namespace) -> StoreResult<T>) -> StoreResult<T> {
        let state = self.state.read();
        state
            .transactions
            .get(&txn)
            .ok_or(StoreError::UnknownTransaction(txn))?
            .ensure_active()?;
        f(&state.namespace)
    }

    fn mutate<T>(
        &self,
        txn: TxnId,
        f: impl FnOnce(&mut Mutation<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self.state.write();
        let StoreState {
            namespace,
            transactions,
        } = &mut *state;

        let record = transactions
            .get_mut(&txn)
            .ok_or(StoreError::UnknownTransaction(txn))?;
        record.ensure_active()?;

        let mut mutation = Mutation::new(namespace, record);
        f(&mut mutation)
    }

    fn require_lock(&self, txn: TxnId, path: &ResourcePath) -> StoreResult<()> {
        if self.locks.is_held_by(path, txn) {
            Ok(())
        } else {
            Err(StoreError::LockNotHeld {
                path: path.to_string(),
                txn,
            })
        }
    }

    /// Write-locks `path` for `txn` until the transaction is closed.
    fn lock_until_close(&self, txn: TxnId, path: &ResourcePath) -> StoreResult<()> {
        if self.locks.is_held_by(path, txn) {
            return Ok(());
        }
        self.locks.acquire(path, txn)?;

        match self.state.write().transactions.get_mut(&txn) {
            Some(record) => {
                record.hold_lock(path.clone());
                trace!(%txn, %path, "locked collection until close");
                Ok(())
            }
            None => {
                self.locks.release(path, txn);
                Err(StoreError::UnknownTransaction(txn))
            }
        }
    }

    /// Locks every collection in the subtree at `root`, returning their paths.
    ///
    /// Repeats until a pass finds nothing new, since collections may be
    /// created below a path while waiting for its lock.
    fn lock_subtree(&self, txn: TxnId, root: &ResourcePath) -> StoreResult<Vec<ResourcePath>> {
        loop {
            let subtree = self.read(txn, |ns| Ok(ns.subtree(root)))?;
            let unlocked: Vec<ResourcePath> = subtree
                .iter()
                .filter(|path| !self.locks.is_held_by(path, txn))
                .cloned()
                .collect();
            if unlocked.is_empty() {
                return Ok(subtree);
            }
            for path in &unlocked {
                self.lock_until_close(txn, path)?;
            }
        }
    }

    /// The nearest existing collection at or above `path`, and the missing
    /// collections between it and `path`, top-down.
    fn creation_plan(ns: &Namespace, path: &ResourcePath) -> (ResourcePath, Vec<ResourcePath>) {
        let mut anchor = path.clone();
        let mut missing = Vec::new();
        while ns.collection(&anchor).is_none() {
            let Some(parent) = anchor.parent() else {
                break;
            };
            missing.push(std::mem::replace(&mut anchor, parent));
        }
        missing.reverse();
        (anchor, missing)
    }

    fn new_permission(subject: &Subject, mode: u32) -> Permission {
        Permission {
            owner: subject.name.clone(),
            group: subject
                .primary_group()
                .unwrap_or(Subject::DBA_GROUP)
                .to_string(),
            mode,
        }
    }

    fn insert_document(
        &self,
        mutation: &mut Mutation<'_>,
        collection: &ResourcePath,
        name: &str,
        kind: DocumentKind,
        mime_type: &str,
        content: Bytes,
    ) -> StoreResult<DocumentHandle> {
        let path = collection.join(name);
        if mutation.namespace().collection(&path).is_some() {
            return Err(StoreError::NameConflict {
                path: path.to_string(),
                existing: "collection",
            });
        }

        let default_permission =
            Self::new_permission(mutation.subject(), self.config.default_document_mode);
        let entry = mutation
            .collection_mut(collection)
            .ok_or_else(|| StoreError::collection_not_found(collection))?;

        let permission = entry
            .documents
            .get(name)
            .map(|existing| existing.permission.clone())
            .unwrap_or(default_permission);

        entry.documents.insert(
            name.to_string(),
            StoredDocument {
                kind,
                mime_type: mime_type.to_string(),
                content,
                permission,
            },
        );

        Ok(DocumentHandle {
            collection: collection.clone(),
            name: name.to_string(),
            kind,
            mime_type: mime_type.to_string(),
        })
    }

    fn remove_document(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
        expected: DocumentKind,
    ) -> StoreResult<()> {
        self.require_lock(txn, &collection.path)?;
        self.mutate(txn, |m| {
            let path = collection.path.join(name);
            let entry = m
                .collection_mut(&collection.path)
                .ok_or_else(|| StoreError::collection_not_found(&collection.path))?;

            match entry.documents.get(name) {
                None => return Err(StoreError::document_not_found(&path)),
                Some(document) if document.kind != expected => {
                    return Err(StoreError::WrongResourceKind {
                        path: path.to_string(),
                        expected: match expected {
                            DocumentKind::Xml => "xml",
                            DocumentKind::Binary => "binary",
                        },
                    });
                }
                Some(_) => {}
            }

            entry.documents.remove(name);
            debug!(%txn, %path, kind = %expected, "removed document");
            Ok(())
        })
    }

    fn relocate_document(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        destination: &CollectionHandle,
        new_name: &str,
        keep_source: bool,
    ) -> StoreResult<()> {
        self.require_lock(txn, &document.collection)?;
        self.require_lock(txn, &destination.path)?;

        let source_path = document.path();
        let target_path = destination.path.join(new_name);
        if source_path == target_path {
            return if keep_source {
                Err(StoreError::invalid_operation(format!(
                    "cannot copy {source_path} onto itself"
                )))
            } else {
                Ok(())
            };
        }

        self.mutate(txn, |m| {
            let stored = m
                .namespace()
                .document(&source_path)
                .cloned()
                .ok_or_else(|| StoreError::document_not_found(&source_path))?;
            if m.namespace().collection(&target_path).is_some() {
                return Err(StoreError::NameConflict {
                    path: target_path.to_string(),
                    existing: "collection",
                });
            }

            m.collection_mut(&destination.path)
                .ok_or_else(|| StoreError::collection_not_found(&destination.path))?
                .documents
                .insert(new_name.to_string(), stored);

            if !keep_source {
                if let Some(source) = m.collection_mut(&document.collection) {
                    source.documents.remove(&document.name);
                }
            }

            debug!(%txn, from = %source_path, to = %target_path, keep_source, "relocated document");
            Ok(())
        })
    }

    fn relocate_collection(
        &self,
        txn: TxnId,
        source: &CollectionHandle,
        destination: &CollectionHandle,
        new_name: &str,
        keep_source: bool,
    ) -> StoreResult<()> {
        self.require_lock(txn, &source.path)?;
        self.require_lock(txn, &destination.path)?;

        if !keep_source && source.path == self.root {
            return Err(StoreError::invalid_operation("cannot move the root collection"));
        }
        let target = destination.path.join(new_name);
        if target.starts_with(&source.path) {
            return Err(StoreError::invalid_operation(format!(
                "cannot relocate {} into itself ({target})",
                source.path
            )));
        }

        for path in self.lock_subtree(txn, &source.path)? {
            if let Some(rebased) = path.rebase(&source.path, &target) {
                self.lock_until_close(txn, &rebased)?;
            }
        }

        self.mutate(txn, |m| {
            let subtree = m.namespace().subtree(&source.path);
            if subtree.is_empty() {
                return Err(StoreError::collection_not_found(&source.path));
            }
            let parent = m
                .namespace()
                .collection(&destination.path)
                .ok_or_else(|| StoreError::collection_not_found(&destination.path))?;
            if parent.documents.contains_key(new_name) {
                return Err(StoreError::NameConflict {
                    path: target.to_string(),
                    existing: "document",
                });
            }
            if m.namespace().collection(&target).is_some() {
                return Err(StoreError::CollectionExists {
                    path: target.to_string(),
                });
            }

            let entries: Vec<(ResourcePath, CollectionEntry)> = subtree
                .iter()
                .filter_map(|path| {
                    let entry = m.namespace().collection(path)?.clone();
                    Some((path.rebase(&source.path, &target)?, entry))
                })
                .collect();

            for (path, entry) in entries {
                m.put(&path, entry);
            }
            if !keep_source {
                for path in subtree.iter().rev() {
                    m.remove(path);
                }
            }

            debug!(
                %txn,
                from = %source.path,
                to = %target,
                collections = subtree.len(),
                keep_source,
                "relocated collection"
            );
            Ok(())
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaStore for MemoryStore {
    fn acquire_broker(&self, subject: &Subject) -> StoreResult<BrokerId> {
        let broker = self.brokers.acquire(subject)?;
        trace!(%broker, subject = %subject.name, "acquired broker");
        Ok(broker)
    }

    fn release_broker(&self, broker: BrokerId) {
        if self.brokers.release(broker) {
            trace!(%broker, "released broker");
        } else {
            warn!(%broker, "released unknown broker");
        }
    }

    fn begin_transaction(&self, broker: BrokerId) -> StoreResult<TxnId> {
        let subject = self
            .brokers
            .subject(broker)
            .ok_or(StoreError::UnknownBroker(broker))?;
        let txn = TxnId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));

        self.state
            .write()
            .transactions
            .insert(txn, TxnRecord::new(txn, broker, subject));
        debug!(%txn, %broker, "began transaction");
        Ok(txn)
    }

    fn commit(&self, txn: TxnId) -> StoreResult<()> {
        let mut state = self.state.write();
        let record = state
            .transactions
            .get_mut(&txn)
            .ok_or(StoreError::UnknownTransaction(txn))?;
        record.ensure_active()?;

        let changes = record.change_count();
        record.mark_committed();
        debug!(%txn, changes, "committed transaction");
        Ok(())
    }

    fn abort(&self, txn: TxnId) -> StoreResult<()> {
        let mut state = self.state.write();
        let StoreState {
            namespace,
            transactions,
        } = &mut *state;

        let record = transactions
            .get_mut(&txn)
            .ok_or(StoreError::UnknownTransaction(txn))?;
        record.ensure_active()?;

        let changes = record.change_count();
        record.roll_back(namespace);
        debug!(%txn, changes, "aborted transaction");
        Ok(())
    }

    fn close(&self, txn: TxnId) {
        let held = {
            let mut state = self.state.write();
            let StoreState {
                namespace,
                transactions,
            } = &mut *state;

            match transactions.remove(&txn) {
                None => {
                    warn!(%txn, "closed unknown transaction");
                    Vec::new()
                }
                Some(mut record) => {
                    if record.state() == TransactionState::Active {
                        warn!(txn = %record.id(), broker = %record.broker(), "closing unfinished transaction, rolling back");
                        record.roll_back(namespace);
                    }
                    record.take_held_locks()
                }
            }
        };
        for path in &held {
            self.locks.release(path, txn);
        }

        let leaked = self.locks.release_all(txn);
        if leaked > 0 {
            warn!(%txn, leaked, "released collection locks still held at close");
        }
    }

    fn open_collection_write(
        &self,
        txn: TxnId,
        path: &ResourcePath,
    ) -> StoreResult<Option<CollectionHandle>> {
        self.read(txn, |_| Ok(()))?;
        self.locks.acquire(path, txn)?;

        let exists = self.read(txn, |ns| Ok(ns.collection(path).is_some()));
        match exists {
            Ok(true) => {
                trace!(%txn, %path, "locked collection");
                Ok(Some(CollectionHandle { path: path.clone() }))
            }
            Ok(false) => {
                self.locks.release(path, txn);
                Ok(None)
            }
            Err(e) => {
                self.locks.release(path, txn);
                Err(e)
            }
        }
    }

    fn release_collection(&self, txn: TxnId, collection: &CollectionHandle) {
        if self.locks.release(&collection.path, txn) {
            trace!(%txn, path = %collection.path, "unlocked collection");
        } else {
            warn!(%txn, path = %collection.path, "released collection lock that was not held");
        }
    }

    fn create_collection(&self, txn: TxnId, path: &ResourcePath) -> StoreResult<CollectionHandle> {
        if !path.starts_with(&self.root) {
            return Err(StoreError::invalid_operation(format!(
                "{path} is outside the root collection {}",
                self.root
            )));
        }

        loop {
            let (anchor, missing) = self.read(txn, |ns| Ok(Self::creation_plan(ns, path)))?;
            self.lock_until_close(txn, &anchor)?;
            for collection in &missing {
                self.lock_until_close(txn, collection)?;
            }
            // Another transaction may have created or removed collections
            // on the way while this one waited.
            let replanned = self.read(txn, |ns| Ok(Self::creation_plan(ns, path)))?;
            if replanned == (anchor, missing) {
                break;
            }
        }

        self.mutate(txn, |m| {
            if m.namespace().collection(path).is_some() {
                return Err(StoreError::CollectionExists {
                    path: path.to_string(),
                });
            }
            for ancestor in path.ancestors_and_self() {
                if m.namespace().collection(&ancestor).is_some() {
                    continue;
                }
                if m.namespace().document(&ancestor).is_some() {
                    return Err(StoreError::NameConflict {
                        path: ancestor.to_string(),
                        existing: "document",
                    });
                }

                let permission =
                    Self::new_permission(m.subject(), self.config.default_collection_mode);
                m.put(&ancestor, CollectionEntry::new(permission));
                debug!(%txn, path = %ancestor, "created collection");
            }
            Ok(CollectionHandle { path: path.clone() })
        })
    }

    fn save_collection(&self, txn: TxnId, collection: &CollectionHandle) -> StoreResult<()> {
        self.read(txn, |ns| {
            ns.collection(&collection.path)
                .map(|_| ())
                .ok_or_else(|| StoreError::collection_not_found(&collection.path))
        })
    }

    fn remove_collection(&self, txn: TxnId, collection: &CollectionHandle) -> StoreResult<()> {
        if collection.path == self.root || collection.path.is_root() {
            return Err(StoreError::invalid_operation("cannot remove the root collection"));
        }
        self.require_lock(txn, &collection.path)?;
        self.lock_subtree(txn, &collection.path)?;

        self.mutate(txn, |m| {
            let subtree = m.namespace().subtree(&collection.path);
            if subtree.is_empty() {
                return Err(StoreError::collection_not_found(&collection.path));
            }
            for path in subtree.iter().rev() {
                m.remove(path);
            }
            debug!(%txn, path = %collection.path, collections = subtree.len(), "removed collection");
            Ok(())
        })
    }

    fn get_document(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
    ) -> StoreResult<Option<DocumentHandle>> {
        self.read(txn, |ns| {
            let entry = ns
                .collection(&collection.path)
                .ok_or_else(|| StoreError::collection_not_found(&collection.path))?;
            Ok(entry.documents.get(name).map(|document| DocumentHandle {
                collection: collection.path.clone(),
                name: name.to_string(),
                kind: document.kind,
                mime_type: document.mime_type.clone(),
            }))
        })
    }

    fn add_binary_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
        content: &mut dyn Read,
        mime_type: &str,
        length: u64,
    ) -> StoreResult<DocumentHandle> {
        self.require_lock(txn, &collection.path)?;

        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        if buf.len() as u64 != length {
            return Err(StoreError::LengthMismatch {
                name: name.to_string(),
                declared: length,
                actual: buf.len() as u64,
            });
        }

        self.mutate(txn, |m| {
            let handle = self.insert_document(
                m,
                &collection.path,
                name,
                DocumentKind::Binary,
                mime_type,
                Bytes::from(buf),
            )?;
            debug!(%txn, path = %handle.path(), length, mime_type, "stored binary document");
            Ok(handle)
        })
    }

    fn validate_xml_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
        source: &mut dyn Read,
    ) -> StoreResult<StagedDocument> {
        self.require_lock(txn, &collection.path)?;
        self.read(txn, |ns| {
            let path = collection.path.join(name);
            if ns.collection(&path).is_some() {
                return Err(StoreError::NameConflict {
                    path: path.to_string(),
                    existing: "collection",
                });
            }
            ns.collection(&collection.path)
                .map(|_| ())
                .ok_or_else(|| StoreError::collection_not_found(&collection.path))
        })?;

        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        xml::check_well_formed(&buf).map_err(|message| StoreError::MalformedXml {
            name: name.to_string(),
            message,
        })?;

        Ok(StagedDocument {
            collection: collection.path.clone(),
            name: name.to_string(),
            mime_type: "application/xml".to_string(),
            digest: Sha256::digest(&buf).into(),
            length: buf.len() as u64,
        })
    }

    fn store_xml_resource(
        &self,
        txn: TxnId,
        staged: &StagedDocument,
        source: &mut dyn Read,
    ) -> StoreResult<DocumentHandle> {
        self.require_lock(txn, &staged.collection)?;

        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        let digest: [u8; 32] = Sha256::digest(&buf).into();
        if digest != staged.digest {
            return Err(StoreError::ContentMismatch {
                name: staged.name.clone(),
            });
        }

        self.mutate(txn, |m| {
            let handle = self.insert_document(
                m,
                &staged.collection,
                &staged.name,
                DocumentKind::Xml,
                &staged.mime_type,
                Bytes::from(buf),
            )?;
            debug!(%txn, path = %handle.path(), length = staged.length, "stored XML document");
            Ok(handle)
        })
    }

    fn remove_binary_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
    ) -> StoreResult<()> {
        self.remove_document(txn, collection, name, DocumentKind::Binary)
    }

    fn remove_xml_resource(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        name: &str,
    ) -> StoreResult<()> {
        self.remove_document(txn, collection, name, DocumentKind::Xml)
    }

    fn copy_resource(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()> {
        self.relocate_document(txn, document, destination, new_name, true)
    }

    fn move_resource(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()> {
        self.relocate_document(txn, document, destination, new_name, false)
    }

    fn copy_collection(
        &self,
        txn: TxnId,
        source: &CollectionHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()> {
        self.relocate_collection(txn, source, destination, new_name, true)
    }

    fn move_collection(
        &self,
        txn: TxnId,
        source: &CollectionHandle,
        destination: &CollectionHandle,
        new_name: &str,
    ) -> StoreResult<()> {
        self.relocate_collection(txn, source, destination, new_name, false)
    }

    fn set_collection_permissions(
        &self,
        txn: TxnId,
        collection: &CollectionHandle,
        update: &PermissionUpdate,
    ) -> StoreResult<()> {
        self.require_lock(txn, &collection.path)?;
        self.mutate(txn, |m| {
            m.collection_mut(&collection.path)
                .ok_or_else(|| StoreError::collection_not_found(&collection.path))?
                .permission
                .apply(update);
            Ok(())
        })
    }

    fn set_document_permissions(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        update: &PermissionUpdate,
    ) -> StoreResult<()> {
        self.require_lock(txn, &document.collection)?;
        self.mutate(txn, |m| {
            m.collection_mut(&document.collection)
                .and_then(|entry| entry.documents.get_mut(&document.name))
                .ok_or_else(|| StoreError::document_not_found(document.path()))?
                .permission
                .apply(update);
            Ok(())
        })
    }

    fn set_document_mime_type(
        &self,
        txn: TxnId,
        document: &DocumentHandle,
        mime_type: &str,
    ) -> StoreResult<()> {
        self.require_lock(txn, &document.collection)?;
        self.mutate(txn, |m| {
            m.collection_mut(&document.collection)
                .and_then(|entry| entry.documents.get_mut(&document.name))
                .ok_or_else(|| StoreError::document_not_found(document.path()))?
                .mime_type = mime_type.to_string();
            Ok(())
        })
    }
}
