//! Routing of envelopes to handlers.

use docrepl_protocol::{ResourceOperation, ResourceType};

/// The handler an envelope is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Store document content.
    CreateOrUpdateDocument,
    /// Change document owner, group, mode or MIME type.
    UpdateDocumentMetadata,
    /// Remove a document.
    DeleteDocument,
    /// Move or copy a document.
    RelocateDocument {
        /// True for copy.
        keep_source: bool,
    },
    /// Create a collection.
    CreateOrUpdateCollection,
    /// Remove a collection and its descendants.
    DeleteCollection,
    /// Move or copy a collection.
    RelocateCollection {
        /// True for copy.
        keep_source: bool,
    },
}

/// Every supported (resource type, operation) pair.
pub const DISPATCH_TABLE: &[(ResourceType, ResourceOperation, Route)] = &[
    (ResourceType::Document, ResourceOperation::Create, Route::CreateOrUpdateDocument),
    (ResourceType::Document, ResourceOperation::Update, Route::CreateOrUpdateDocument),
    (ResourceType::Document, ResourceOperation::Metadata, Route::UpdateDocumentMetadata),
    (ResourceType::Document, ResourceOperation::Delete, Route::DeleteDocument),
    (ResourceType::Document, ResourceOperation::Move, Route::RelocateDocument { keep_source: false }),
    (ResourceType::Document, ResourceOperation::Copy, Route::RelocateDocument { keep_source: true }),
    (ResourceType::Collection, ResourceOperation::Create, Route::CreateOrUpdateCollection),
    (ResourceType::Collection, ResourceOperation::Update, Route::CreateOrUpdateCollection),
    (ResourceType::Collection, ResourceOperation::Delete, Route::DeleteCollection),
    (ResourceType::Collection, ResourceOperation::Move, Route::RelocateCollection { keep_source: false }),
    (ResourceType::Collection, ResourceOperation::Copy, Route::RelocateCollection { keep_source: true }),
];

/// Looks up the handler for a pair, `None` if it is unsupported.
#[must_use]
pub fn route(resource_type: ResourceType, operation: ResourceOperation) -> Option<Route> {
    DISPATCH_TABLE
        .iter()
        .find(|(t, op, _)| *t == resource_type && *op == operation)
        .map(|(_, _, route)| *route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_but_collection_metadata_is_routed() {
        for resource_type in ResourceType::ALL {
            for operation in ResourceOperation::ALL {
                let routed = route(resource_type, operation).is_some();
                let expected = !(resource_type == ResourceType::Collection
                    && operation == ResourceOperation::Metadata);
                assert_eq!(routed, expected, "{resource_type} {operation}");
            }
        }
    }

    #[test]
    fn table_has_no_duplicate_pairs() {
        for (i, (t, op, _)) in DISPATCH_TABLE.iter().enumerate() {
            assert!(DISPATCH_TABLE[i + 1..]
                .iter()
                .all(|(t2, op2, _)| (t2, op2) != (t, op)));
        }
    }

    #[test]
    fn relocation_routes_carry_keep_source() {
        assert_eq!(
            route(ResourceType::Document, ResourceOperation::Copy),
            Some(Route::RelocateDocument { keep_source: true })
        );
        assert_eq!(
            route(ResourceType::Collection, ResourceOperation::Move),
            Some(Route::RelocateCollection { keep_source: false })
        );
    }
}
