//! Scoped session, transaction and lock handling for one apply.

use crate::error::{ReplicationError, ReplicationResult};
use docrepl_store::{BrokerId, CollectionHandle, ReplicaStore, ResourcePath, Subject, TxnId};
use tracing::{debug, warn};

/// How a transactional body wants its transaction to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Make the changes visible.
    Commit,
    /// Discard the changes; the apply still succeeds.
    Rollback,
}

/// One broker session and one transaction, plus the collection write locks
/// taken inside it.
///
/// Dropping the scope releases everything: an unfinished transaction is
/// aborted, locks are released in reverse acquisition order, then the
/// transaction is closed and the broker returned to the pool.
pub struct ApplyScope<'s> {
    store: &'s dyn ReplicaStore,
    broker: BrokerId,
    txn: TxnId,
    locks: Vec<CollectionHandle>,
    finished: bool,
}

impl<'s> ApplyScope<'s> {
    /// Acquires a broker for `subject` and begins a transaction.
    ///
    /// # Errors
    ///
    /// Fails if no broker is available or the transaction cannot begin; in
    /// the latter case the broker is returned before failing.
    pub fn begin(store: &'s dyn ReplicaStore, subject: &Subject) -> ReplicationResult<Self> {
        let broker = store.acquire_broker(subject)?;
        let txn = match store.begin_transaction(broker) {
            Ok(txn) => txn,
            Err(e) => {
                store.release_broker(broker);
                return Err(e.into());
            }
        };

        debug!(%txn, %broker, subject = %subject.name, "apply scope opened");
        Ok(Self {
            store,
            broker,
            txn,
            locks: Vec::new(),
            finished: false,
        })
    }

    /// The scope's transaction.
    #[must_use]
    pub fn txn(&self) -> TxnId {
        self.txn
    }

    /// The store the scope works on.
    #[must_use]
    pub fn store(&self) -> &'s dyn ReplicaStore {
        self.store
    }

    /// Write-locks the collection at `path`.
    ///
    /// Returns `None` without holding a lock if the collection does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the lock cannot be acquired.
    pub fn lock(&mut self, path: &ResourcePath) -> ReplicationResult<Option<CollectionHandle>> {
        let handle = self.store.open_collection_write(self.txn, path)?;
        if let Some(handle) = &handle {
            self.locks.push(handle.clone());
        }
        Ok(handle)
    }

    /// Write-locks the collection at `path`, which must exist.
    ///
    /// # Errors
    ///
    /// Fails with `ResourceNotFound` if the collection does not exist.
    pub fn lock_existing(&mut self, path: &ResourcePath) -> ReplicationResult<CollectionHandle> {
        self.lock(path)?
            .ok_or_else(|| ReplicationError::collection_not_found(path))
    }

    /// Number of locks held by the scope.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Commits the transaction and releases the scope.
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the commit; the transaction is then
    /// aborted on release.
    pub fn commit(mut self) -> ReplicationResult<()> {
        self.store.commit(self.txn)?;
        self.finished = true;
        Ok(())
    }

    /// Aborts the transaction and releases the scope.
    ///
    /// # Errors
    ///
    /// Fails if the store rejects the abort.
    pub fn abort(mut self) -> ReplicationResult<()> {
        self.finished = true;
        self.store.abort(self.txn)?;
        Ok(())
    }
}

impl Drop for ApplyScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.store.abort(self.txn) {
                warn!(txn = %self.txn, error = %e, "abort during scope release failed");
            }
        }
        for handle in self.locks.drain(..).rev() {
            self.store.release_collection(self.txn, &handle);
        }
        self.store.close(self.txn);
        self.store.release_broker(self.broker);
        debug!(txn = %self.txn, broker = %self.broker, "apply scope released");
    }
}

/// Runs `body` inside a fresh [`ApplyScope`].
///
/// The transaction is committed or rolled back as `body` asks; if `body`
/// fails, the transaction is aborted and the error returned unchanged.
///
/// # Errors
///
/// Returns the error of `body`, or of beginning or finishing the scope.
pub fn transactional<F>(
    store: &dyn ReplicaStore,
    subject: &Subject,
    body: F,
) -> ReplicationResult<Outcome>
where
    F: FnOnce(&mut ApplyScope<'_>) -> ReplicationResult<Outcome>,
{
    let mut scope = ApplyScope::begin(store, subject)?;
    let outcome = body(&mut scope)?;
    match outcome {
        Outcome::Commit => scope.commit()?,
        Outcome::Rollback => scope.abort()?,
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use docrepl_store::{MemoryStore, StoreConfig};

    fn path(p: &str) -> ResourcePath {
        ResourcePath::parse(p).unwrap()
    }

    fn assert_no_leaks(store: &MemoryStore) {
        assert_eq!(store.held_locks(), 0);
        assert_eq!(store.open_transactions(), 0);
        assert_eq!(store.active_brokers(), 0);
    }

    #[test]
    fn commit_keeps_changes_and_releases_everything() {
        let store = MemoryStore::new();
        let outcome = transactional(&store, &Subject::system(), |scope| {
            scope.store().create_collection(scope.txn(), &path("/db/a"))?;
            scope.lock_existing(&path("/db/a"))?;
            scope.lock_existing(&path("/db"))?;
            assert_eq!(scope.lock_count(), 2);
            Ok(Outcome::Commit)
        })
        .unwrap();

        assert_eq!(outcome, Outcome::Commit);
        assert!(store.collection("/db/a").is_some());
        assert_no_leaks(&store);
    }

    #[test]
    fn rollback_discards_changes() {
        let store = MemoryStore::new();
        transactional(&store, &Subject::system(), |scope| {
            scope.store().create_collection(scope.txn(), &path("/db/a"))?;
            Ok(Outcome::Rollback)
        })
        .unwrap();

        assert!(store.collection("/db/a").is_none());
        assert_no_leaks(&store);
    }

    #[test]
    fn failing_body_aborts_and_returns_error_unchanged() {
        let store = MemoryStore::new();
        let err = transactional(&store, &Subject::system(), |scope| {
            scope.store().create_collection(scope.txn(), &path("/db/a"))?;
            scope.lock_existing(&path("/db/a"))?;
            scope.lock_existing(&path("/db/missing"))?;
            Ok(Outcome::Commit)
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert!(store.collection("/db/a").is_none());
        assert_no_leaks(&store);
    }

    #[test]
    fn exhausted_broker_pool_is_an_apply_error() {
        let store = MemoryStore::with_config(
            StoreConfig::new()
                .with_max_brokers(1)
                .with_broker_timeout(std::time::Duration::from_millis(10)),
        );
        let _held = store.acquire_broker(&Subject::system()).unwrap();

        let err = ApplyScope::begin(&store, &Subject::system()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Apply);
        assert_eq!(store.open_transactions(), 0);
    }
}
