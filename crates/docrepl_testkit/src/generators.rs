//! Property-based test generators using proptest.
//!
//! Provides strategies for generating names, paths and content that the
//! apply path accepts.

use proptest::prelude::*;

/// Strategy for generating a single path segment.
pub fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,11}").expect("Invalid regex")
}

/// Strategy for generating collection paths below `/db`.
pub fn collection_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..4)
        .prop_map(|segments| format!("/db/{}", segments.join("/")))
}

/// Strategy for generating XML document names.
pub fn xml_name_strategy() -> impl Strategy<Value = String> {
    segment_strategy().prop_map(|stem| format!("{stem}.xml"))
}

/// Strategy for generating binary document names with a known extension.
pub fn binary_name_strategy() -> impl Strategy<Value = String> {
    (segment_strategy(), prop::sample::select(vec!["bin", "png", "pdf", "txt", "json"]))
        .prop_map(|(stem, ext)| format!("{stem}.{ext}"))
}

/// Strategy for generating well-formed XML documents.
pub fn xml_content_strategy() -> impl Strategy<Value = String> {
    let leaf = (segment_strategy(), "[a-zA-Z0-9 ]{0,16}")
        .prop_map(|(tag, text)| format!("<{tag}>{text}</{tag}>"));
    (segment_strategy(), prop::collection::vec(leaf, 0..6))
        .prop_map(|(root, children)| format!("<{root}>{}</{root}>", children.concat()))
}

/// Strategy for generating binary content.
pub fn binary_content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Strategy for generating valid mode bits.
pub fn mode_strategy() -> impl Strategy<Value = u32> {
    0u32..=0o777
}
