//! The collection tree held by [`super::MemoryStore`].

use crate::path::ResourcePath;
use crate::types::{DocumentKind, Permission};
use bytes::Bytes;
use std::collections::BTreeMap;

/// A document as held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Content kind.
    pub kind: DocumentKind,
    /// MIME type.
    pub mime_type: String,
    /// Content bytes.
    pub content: Bytes,
    /// Owner, group and mode.
    pub permission: Permission,
}

/// A collection and the documents directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Owner, group and mode.
    pub permission: Permission,
    /// Documents keyed by name.
    pub documents: BTreeMap<String, StoredDocument>,
}

impl CollectionEntry {
    pub(crate) fn new(permission: Permission) -> Self {
        Self {
            permission,
            documents: BTreeMap::new(),
        }
    }
}

/// Every collection of the store, keyed by path.
///
/// Sub-collections are not nested inside their parents; a collection's
/// descendants are the entries whose path starts with its path, which the
/// segment-wise path ordering keeps contiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    collections: BTreeMap<ResourcePath, CollectionEntry>,
}

impl Namespace {
    /// Returns the collection at `path`.
    #[must_use]
    pub fn collection(&self, path: &ResourcePath) -> Option<&CollectionEntry> {
        self.collections.get(path)
    }

    /// Returns the document at `path`.
    #[must_use]
    pub fn document(&self, path: &ResourcePath) -> Option<&StoredDocument> {
        let (parent, name) = path.split()?;
        self.collections.get(&parent)?.documents.get(name)
    }

    /// Iterates over all collection paths in order.
    pub fn collection_paths(&self) -> impl Iterator<Item = &ResourcePath> {
        self.collections.keys()
    }

    /// Number of collections.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Number of documents across all collections.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.collections.values().map(|c| c.documents.len()).sum()
    }

    /// Paths of `path` and every collection below it, parents first.
    pub(crate) fn subtree(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        self.collections
            .range(path.clone()..)
            .map(|(p, _)| p)
            .take_while(|p| p.starts_with(path))
            .cloned()
            .collect()
    }

    pub(crate) fn get_mut(&mut self, path: &ResourcePath) -> Option<&mut CollectionEntry> {
        self.collections.get_mut(path)
    }

    /// Sets or clears the entry at `path`, returning the previous one.
    pub(crate) fn replace(
        &mut self,
        path: &ResourcePath,
        entry: Option<CollectionEntry>,
    ) -> Option<CollectionEntry> {
        match entry {
            Some(entry) => self.collections.insert(path.clone(), entry),
            None => self.collections.remove(path),
        }
    }
}
