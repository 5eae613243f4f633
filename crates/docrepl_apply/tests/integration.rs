//! End-to-end tests: inbound messages through the listener into the store.

use docrepl_apply::{ApplyConfig, ErrorKind};
use docrepl_protocol::{
    Envelope, InboundMessage, Metadata, ResourceOperation, ResourceType, DESTINATION_PATH,
    RESOURCE_OPERATION, RESOURCE_TYPE, SOURCE_PATH,
};
use docrepl_store::{DocumentKind, ResourcePath, StoreConfig};
use docrepl_testkit::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn path(p: &str) -> ResourcePath {
    ResourcePath::parse(p).unwrap()
}

fn message(resource_type: &str, operation: &str, source: &str) -> InboundMessage {
    InboundMessage::new()
        .with_property(RESOURCE_TYPE, resource_type)
        .with_property(RESOURCE_OPERATION, operation)
        .with_property(SOURCE_PATH, source)
}

#[test]
fn applies_message_vectors() {
    init_test_tracing();

    for vector in docrepl_testkit::message_vectors() {
        let replica = TestReplica::new();
        replica.seed_collection("/db/site");
        let before = replica.store.snapshot();

        let result = replica.listener().on_message(&vector.to_message());

        match &vector.expected_error {
            None => assert!(result.is_ok(), "{}: {:?}", vector.id, result),
            Some(kind) => {
                let err = result.expect_err(&vector.id);
                assert_eq!(err.kind().as_str(), kind, "{}: {err}", vector.id);
                assert_eq!(replica.store.snapshot(), before, "{} changed the store", vector.id);
            }
        }
        replica.assert_no_leaks();
    }
}

#[test]
fn compressed_xml_document_lifecycle() {
    init_test_tracing();
    let replica = TestReplica::new();
    replica.seed_collection("/db/site");
    let listener = replica.listener();

    let content = b"<page><title>Hello</title></page>";
    listener
        .on_message(
            &message("DOCUMENT", "CREATE", "/db/site/page.xml")
                .with_property(Metadata::OWNER, "editor")
                .with_property(Metadata::MODE, 0o640_i64)
                .with_body(gzip(content)),
        )
        .unwrap();

    let stored = replica.store.document("/db/site/page.xml").unwrap();
    assert_eq!(stored.kind, DocumentKind::Xml);
    assert_eq!(stored.content.as_ref(), content);
    assert_eq!(stored.permission.owner, "editor");
    assert_eq!(stored.permission.mode, 0o640);

    listener
        .on_message(
            &message("DOCUMENT", "METADATA", "/db/site/page.xml")
                .with_property(Metadata::GROUP, "editors")
                .with_property(Metadata::MIME_TYPE, "application/xml"),
        )
        .unwrap();
    let stored = replica.store.document("/db/site/page.xml").unwrap();
    assert_eq!(stored.permission.group, "editors");
    assert_eq!(stored.mime_type, "application/xml");

    let err = listener
        .on_message(
            &message("DOCUMENT", "MOVE", "/db/site/page.xml")
                .with_property(DESTINATION_PATH, "/db/archive/page.xml"),
        )
        .expect_err("destination collection does not exist yet");
    assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    assert!(replica.store.document("/db/site/page.xml").is_some());

    replica.seed_collection("/db/archive");
    listener
        .on_message(
            &message("DOCUMENT", "MOVE", "/db/site/page.xml")
                .with_property(DESTINATION_PATH, "/db/archive/page.xml"),
        )
        .unwrap();
    assert!(replica.store.document("/db/site/page.xml").is_none());
    assert_eq!(
        replica.store.document("/db/archive/page.xml").unwrap().content.as_ref(),
        content
    );

    listener
        .on_message(&message("DOCUMENT", "DELETE", "/db/archive/page.xml"))
        .unwrap();
    assert!(replica.store.document("/db/archive/page.xml").is_none());
    replica.assert_no_leaks();
}

#[test]
fn collection_tree_lifecycle() {
    init_test_tracing();
    let replica = TestReplica::new();
    let listener = replica.listener();

    listener
        .on_message(
            &message("COLLECTION", "CREATE", "/db/a/b")
                .with_property(Metadata::OWNER, "admin")
                .with_property(Metadata::MODE, 0o700_i64),
        )
        .unwrap();
    assert!(replica.store.collection("/db/a").is_some());
    assert_eq!(replica.store.collection("/db/a/b").unwrap().permission.mode, 0o700);

    replica.seed_document("/db/a/b/doc.xml", b"<doc/>");
    listener
        .on_message(
            &message("COLLECTION", "COPY", "/db/a").with_property(DESTINATION_PATH, "/db/c"),
        )
        .unwrap();
    assert!(replica.store.document("/db/a/b/doc.xml").is_some());
    assert!(replica.store.document("/db/c/b/doc.xml").is_some());

    listener
        .on_message(
            &message("COLLECTION", "MOVE", "/db/c").with_property(DESTINATION_PATH, "/db/d"),
        )
        .unwrap();
    assert!(replica.store.collection("/db/c").is_none());
    assert!(replica.store.document("/db/d/b/doc.xml").is_some());

    listener
        .on_message(&message("COLLECTION", "DELETE", "/db/a"))
        .unwrap();
    assert!(replica.store.collection("/db/a").is_none());
    assert!(replica.store.collection("/db/a/b").is_none());

    // Second delete finds nothing and still succeeds.
    listener
        .on_message(&message("COLLECTION", "DELETE", "/db/a"))
        .unwrap();
    replica.assert_no_leaks();
}

#[test]
fn moving_collection_into_itself_rolls_back() {
    let replica = TestReplica::new();
    replica.seed_collection("/db/a/b");
    let before = replica.store.snapshot();

    let envelope = Envelope::new(ResourceType::Collection, ResourceOperation::Move, path("/db/a"))
        .with_destination(path("/db/a/b/a"));
    let err = replica.apply(&envelope).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Apply);
    assert_eq!(replica.store.snapshot(), before);
    replica.assert_no_leaks();
}

#[test]
fn failure_after_partial_work_leaves_store_unchanged() {
    let replica = TestReplica::new();
    replica.seed_collection("/db/site");
    replica.seed_document("/db/site/old.xml", b"<old/>");
    let before = replica.store.snapshot();

    // Malformed XML fails validation after the collection is locked.
    let envelope = Envelope::new(
        ResourceType::Document,
        ResourceOperation::Update,
        path("/db/site/old.xml"),
    )
    .with_payload(gzip(b"<unclosed>"));
    let err = replica.apply(&envelope).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Apply);
    assert_eq!(replica.store.snapshot(), before);
    replica.assert_no_leaks();
}

#[test]
fn decompression_limit_is_enforced() {
    let config = ApplyConfig::default().with_max_decompressed_bytes(16);
    let replica = TestReplica::with_config(StoreConfig::default(), config);
    replica.seed_collection("/db/site");

    let envelope = Envelope::new(
        ResourceType::Document,
        ResourceOperation::Create,
        path("/db/site/big.txt"),
    )
    .with_payload(gzip(&[b'x'; 1024]));
    let err = replica.apply(&envelope).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Apply);
    assert!(replica.store.document("/db/site/big.txt").is_none());
    replica.assert_no_leaks();
}

#[test]
fn concurrent_writers_on_one_collection_serialize() {
    let replica = Arc::new(TestReplica::with_config(
        StoreConfig::default().with_lock_timeout(Duration::from_secs(10)),
        ApplyConfig::default(),
    ));
    replica.seed_collection("/db/shared");

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let replica = Arc::clone(&replica);
            thread::spawn(move || {
                let listener = replica.listener();
                for i in 0..10 {
                    let name = format!("/db/shared/w{worker}-{i}.txt");
                    listener
                        .on_message(
                            &message("DOCUMENT", "CREATE", &name)
                                .with_body(gzip(name.as_bytes())),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let shared = replica.store.collection("/db/shared").unwrap();
    assert_eq!(shared.documents.len(), 80);
    let stored = replica.store.document("/db/shared/w3-7.txt").unwrap();
    assert_eq!(stored.content.as_ref(), b"/db/shared/w3-7.txt");
    replica.assert_no_leaks();
}

#[test]
fn concurrent_collection_moves_do_not_deadlock() {
    let replica = Arc::new(TestReplica::with_config(
        StoreConfig::default().with_lock_timeout(Duration::from_millis(500)),
        ApplyConfig::default(),
    ));
    replica.seed_collection("/db/x");
    replica.seed_collection("/db/y");

    let handles: Vec<_> = [("/db/x", "/db/y/x"), ("/db/y", "/db/x/y")]
        .into_iter()
        .map(|(from, to)| {
            let replica = Arc::clone(&replica);
            thread::spawn(move || {
                let envelope =
                    Envelope::new(ResourceType::Collection, ResourceOperation::Move, path(from))
                        .with_destination(path(to));
                replica.apply(&envelope)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // At most one can succeed: after it, the other's source has moved.
    assert!(results.iter().filter(|r| r.is_ok()).count() <= 1);
    replica.assert_no_leaks();
}

#[test]
fn concurrent_document_moves_in_opposite_directions() {
    let replica = Arc::new(TestReplica::with_config(
        StoreConfig::default().with_lock_timeout(Duration::from_millis(200)),
        ApplyConfig::default(),
    ));
    replica.seed_collection("/db/p");
    replica.seed_collection("/db/q");

    for round in 0..10 {
        let from_p = format!("/db/p/a{round}.txt");
        let from_q = format!("/db/q/b{round}.txt");
        replica.seed_document(&from_p, b"from p");
        replica.seed_document(&from_q, b"from q");

        // Each move locks its source collection before the other one.
        let moves = [
            (from_p.clone(), format!("/db/q/a{round}.txt")),
            (from_q.clone(), format!("/db/p/b{round}.txt")),
        ];
        let handles: Vec<_> = moves
            .iter()
            .cloned()
            .map(|(from, to)| {
                let replica = Arc::clone(&replica);
                thread::spawn(move || {
                    let envelope =
                        Envelope::new(ResourceType::Document, ResourceOperation::Move, path(&from))
                            .with_destination(path(&to));
                    replica.apply(&envelope)
                })
            })
            .collect();

        for ((from, to), handle) in moves.iter().zip(handles) {
            match handle.join().unwrap() {
                Ok(()) => {
                    assert!(replica.store.document(from).is_none());
                    assert!(replica.store.document(to).is_some());
                }
                Err(e) => {
                    assert_eq!(e.kind(), ErrorKind::Apply, "{e}");
                    assert!(replica.store.document(from).is_some());
                    assert!(replica.store.document(to).is_none());
                }
            }
        }
        replica.assert_no_leaks();
    }
}

#[test]
fn concurrent_creates_of_one_collection_yield_one_success() {
    let replica = Arc::new(TestReplica::new());

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let replica = Arc::clone(&replica);
            thread::spawn(move || {
                replica.apply(&Envelope::new(
                    ResourceType::Collection,
                    ResourceOperation::Create,
                    path("/db/contended"),
                ))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), ErrorKind::Conflict, "{err}");
    }
    assert!(replica.store.collection("/db/contended").is_some());
    replica.assert_no_leaks();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn created_xml_is_stored_exactly(
        collection in collection_path_strategy(),
        name in xml_name_strategy(),
        content in xml_content_strategy(),
        mode in mode_strategy(),
    ) {
        let replica = TestReplica::new();
        replica.seed_collection(&collection);

        let source = format!("{collection}/{name}");
        let envelope = Envelope::new(ResourceType::Document, ResourceOperation::Create, path(&source))
            .with_payload(gzip(content.as_bytes()))
            .with_metadata(Metadata::MODE, i64::from(mode));
        replica.apply(&envelope).unwrap();

        let stored = replica.store.document(&source).unwrap();
        prop_assert_eq!(stored.kind, DocumentKind::Xml);
        prop_assert_eq!(stored.content.as_ref(), content.as_bytes());
        prop_assert_eq!(stored.permission.mode, mode);
        replica.assert_no_leaks();
    }

    #[test]
    fn created_binary_is_stored_exactly(
        collection in collection_path_strategy(),
        name in binary_name_strategy(),
        content in binary_content_strategy(),
        compressed in any::<bool>(),
    ) {
        let replica = TestReplica::new();
        replica.seed_collection(&collection);

        let source = format!("{collection}/{name}");
        let payload = if compressed { gzip(&content) } else { content.clone() };
        let envelope = Envelope::new(ResourceType::Document, ResourceOperation::Create, path(&source))
            .with_payload(payload);

        // Plain payloads that happen to begin with the gzip magic are
        // rejected as corrupt archives.
        let looks_compressed = content.starts_with(&[0x1f, 0x8b]);
        match replica.apply(&envelope) {
            Ok(()) => {
                let stored = replica.store.document(&source).unwrap();
                prop_assert_eq!(stored.kind, DocumentKind::Binary);
                prop_assert_eq!(stored.content.as_ref(), content.as_slice());
            }
            Err(e) => prop_assert!(!compressed && looks_compressed, "unexpected failure: {}", e),
        }
        replica.assert_no_leaks();
    }

    #[test]
    fn failed_apply_leaves_store_unchanged(
        collection in collection_path_strategy(),
        name in xml_name_strategy(),
        owner in "[a-z]{3,8}",
    ) {
        let replica = TestReplica::new();
        replica.seed_collection(&collection);
        let before = replica.store.snapshot();

        // Unknown owners and a missing parent collection both fail.
        let owner = format!("unknown-{owner}");
        let missing = format!("{collection}/missing/{name}");
        for source in [format!("{collection}/{name}"), missing] {
            let envelope = Envelope::new(ResourceType::Document, ResourceOperation::Create, path(&source))
                .with_payload(gzip(b"<a/>"))
                .with_metadata(Metadata::OWNER, owner.clone());
            prop_assert!(replica.apply(&envelope).is_err());
        }

        prop_assert_eq!(replica.store.snapshot(), before);
        replica.assert_no_leaks();
    }
}
