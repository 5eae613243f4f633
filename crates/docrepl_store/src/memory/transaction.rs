//! Transaction state and undo log.

use super::namespace::{CollectionEntry, Namespace};
use crate::error::{StoreError, StoreResult};
use crate::path::ResourcePath;
use crate::types::{BrokerId, Subject, TxnId};
use std::collections::HashSet;
use std::fmt;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => f.write_str("active"),
            TransactionState::Committed => f.write_str("committed"),
            TransactionState::Aborted => f.write_str("aborted"),
        }
    }
}

/// An open transaction.
///
/// Changes are applied to the namespace immediately; before a collection
/// entry is first touched its previous value is saved so that abort can put
/// it back.
#[derive(Debug)]
pub(crate) struct TxnRecord {
    id: TxnId,
    broker: BrokerId,
    subject: Subject,
    state: TransactionState,
    undo: Vec<(ResourcePath, Option<CollectionEntry>)>,
    saved: HashSet<ResourcePath>,
    held: Vec<ResourcePath>,
}

impl TxnRecord {
    pub(crate) fn new(id: TxnId, broker: BrokerId, subject: Subject) -> Self {
        Self {
            id,
            broker,
            subject,
            state: TransactionState::Active,
            undo: Vec::new(),
            saved: HashSet::new(),
            held: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> TxnId {
        self.id
    }

    pub(crate) fn broker(&self) -> BrokerId {
        self.broker
    }

    pub(crate) fn subject(&self) -> &Subject {
        &self.subject
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(StoreError::TransactionNotActive {
                txn: self.id,
                state: state.to_string(),
            }),
        }
    }

    /// Saves the current value of `path` unless it was saved before.
    pub(crate) fn save(&mut self, namespace: &Namespace, path: &ResourcePath) {
        if self.saved.insert(path.clone()) {
            self.undo
                .push((path.clone(), namespace.collection(path).cloned()));
        }
    }

    /// Records a collection lock taken by the store itself, held until close.
    pub(crate) fn hold_lock(&mut self, path: ResourcePath) {
        self.held.push(path);
    }

    pub(crate) fn take_held_locks(&mut self) -> Vec<ResourcePath> {
        std::mem::take(&mut self.held)
    }

    pub(crate) fn change_count(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn mark_committed(&mut self) {
        self.undo.clear();
        self.saved.clear();
        self.state = TransactionState::Committed;
    }

    /// Restores every saved entry, newest first.
    pub(crate) fn roll_back(&mut self, namespace: &mut Namespace) {
        for (path, previous) in self.undo.drain(..).rev() {
            namespace.replace(&path, previous);
        }
        self.saved.clear();
        self.state = TransactionState::Aborted;
    }
}

/// Mutable access to the namespace on behalf of one transaction.
///
/// Every write goes through [`TxnRecord::save`] first.
pub(crate) struct Mutation<'a> {
    namespace: &'a mut Namespace,
    record: &'a mut TxnRecord,
}

impl<'a> Mutation<'a> {
    pub(crate) fn new(namespace: &'a mut Namespace, record: &'a mut TxnRecord) -> Self {
        Self { namespace, record }
    }

    pub(crate) fn namespace(&self) -> &Namespace {
        self.namespace
    }

    pub(crate) fn subject(&self) -> &Subject {
        self.record.subject()
    }

    pub(crate) fn collection_mut(&mut self, path: &ResourcePath) -> Option<&mut CollectionEntry> {
        self.record.save(self.namespace, path);
        self.namespace.get_mut(path)
    }

    pub(crate) fn put(&mut self, path: &ResourcePath, entry: CollectionEntry) {
        self.record.save(self.namespace, path);
        self.namespace.replace(path, Some(entry));
    }

    pub(crate) fn remove(&mut self, path: &ResourcePath) -> Option<CollectionEntry> {
        self.record.save(self.namespace, path);
        self.namespace.replace(path, None)
    }
}
