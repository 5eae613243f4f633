//! Test fixtures for a replica backed by the in-memory collaborators.

use docrepl_apply::{ApplyConfig, MessageListener, ReplicationResult, Replicator};
use docrepl_protocol::Envelope;
use docrepl_store::{
    DefaultMimeTable, MemorySecurityManager, MemoryStore, MimeType, ReplicaStore, ResourcePath,
    StoreConfig, Subject,
};
use std::io::Cursor;
use std::sync::Arc;

/// A replica wired to a [`MemoryStore`], ready to apply changes.
///
/// Seeded accounts: `SYSTEM` (group `dba`), `admin` (group `dba`) and
/// `editor` (group `editors`).
pub struct TestReplica {
    /// The store changes are applied to.
    pub store: Arc<MemoryStore>,
    /// The account registry.
    pub security: Arc<MemorySecurityManager>,
    /// The content-type table.
    pub mime: Arc<DefaultMimeTable>,
    /// The replicator under test.
    pub replicator: Replicator,
    config: ApplyConfig,
}

impl TestReplica {
    /// Creates a replica with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default(), ApplyConfig::default())
    }

    /// Creates a replica with the given configuration.
    pub fn with_config(store_config: StoreConfig, config: ApplyConfig) -> Self {
        let store = Arc::new(MemoryStore::with_config(store_config));
        let security = Arc::new(MemorySecurityManager::new());
        security.add_account("admin", "dba");
        security.add_account("editor", "editors");
        let mime = Arc::new(DefaultMimeTable::new());

        let replicator = Replicator::new(
            store.clone(),
            security.clone(),
            mime.clone(),
            config.clone(),
        );

        Self {
            store,
            security,
            mime,
            replicator,
            config,
        }
    }

    /// Builds a listener over the same collaborators.
    pub fn listener(&self) -> MessageListener {
        MessageListener::new(Replicator::new(
            self.store.clone(),
            self.security.clone(),
            self.mime.clone(),
            self.config.clone(),
        ))
        .expect("acting account exists")
    }

    /// Applies an envelope as the system subject.
    pub fn apply(&self, envelope: &Envelope) -> ReplicationResult<()> {
        self.replicator.apply(envelope, &Subject::system())
    }

    /// Creates a collection (and its ancestors) directly in the store.
    pub fn seed_collection(&self, path: &str) {
        let path = ResourcePath::parse(path).expect("valid collection path");
        self.with_txn(|store, txn| {
            store.create_collection(txn, &path).expect("create collection");
        });
    }

    /// Stores a document directly in the store, bypassing the apply path.
    ///
    /// Content starting with `<` is stored as XML, anything else as binary.
    pub fn seed_document(&self, path: &str, content: &[u8]) {
        let path = ResourcePath::parse(path).expect("valid document path");
        let (parent, name) = path.split().expect("document path has a parent");

        self.with_txn(|store, txn| {
            let collection = store
                .open_collection_write(txn, &parent)
                .expect("lock collection")
                .expect("parent collection exists");
            if content.starts_with(b"<") {
                let staged = store
                    .validate_xml_resource(txn, &collection, name, &mut Cursor::new(content))
                    .expect("well-formed XML");
                store
                    .store_xml_resource(txn, &staged, &mut Cursor::new(content))
                    .expect("store XML");
            } else {
                store
                    .add_binary_resource(
                        txn,
                        &collection,
                        name,
                        &mut Cursor::new(content),
                        MimeType::BINARY,
                        content.len() as u64,
                    )
                    .expect("store binary");
            }
            store.release_collection(txn, &collection);
        });
    }

    /// Asserts that no lock, transaction or broker session is left behind.
    pub fn assert_no_leaks(&self) {
        assert_eq!(self.store.held_locks(), 0, "collection locks still held");
        assert_eq!(self.store.open_transactions(), 0, "transactions still open");
        assert_eq!(self.store.active_brokers(), 0, "brokers still active");
    }

    fn with_txn(&self, f: impl FnOnce(&MemoryStore, docrepl_store::TxnId)) {
        let broker = self
            .store
            .acquire_broker(&Subject::system())
            .expect("acquire broker");
        let txn = self.store.begin_transaction(broker).expect("begin transaction");
        f(&self.store, txn);
        self.store.commit(txn).expect("commit");
        self.store.close(txn);
        self.store.release_broker(broker);
    }
}

impl Default for TestReplica {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_commits_and_releases() {
        let replica = TestReplica::new();
        replica.seed_collection("/db/a/b");
        replica.seed_document("/db/a/doc.xml", b"<doc/>");
        replica.seed_document("/db/a/b/data.bin", &[0, 1, 2]);

        assert!(replica.store.collection("/db/a/b").is_some());
        assert_eq!(replica.store.document("/db/a/doc.xml").unwrap().content, "<doc/>");
        assert_eq!(replica.store.document("/db/a/b/data.bin").unwrap().content.len(), 3);
        replica.assert_no_leaks();
    }

    #[test]
    fn listener_acts_as_system() {
        let replica = TestReplica::new();
        assert_eq!(replica.listener().subject().name, "SYSTEM");
    }
}
