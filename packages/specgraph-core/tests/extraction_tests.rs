//! Extraction pipeline behavior over full documents.

mod common;

use common::{index_json, Widget};
use pretty_assertions::assert_eq;
use serde_json::json;
use specgraph_core::{
    extract_map, extract_object, extract_raw, BuildContext, Buildable, Hashable, SpecgraphError,
};

#[test]
fn nested_widget_graph_builds_depth_first() {
    let index = index_json(&json!({
        "widget": {
            "name": "root",
            "size": 2,
            "parts": [
                {"name": "left"},
                {"$ref": "#/components/widgets/shared"}
            ],
            "links": {
                "north": {"name": "n"},
                "south": {"$ref": "#/components/widgets/shared"}
            }
        },
        "components": {"widgets": {"shared": {"name": "shared", "size": 9}}}
    }));
    let ctx = BuildContext::new();
    let root = index.tree().root_content();

    let widget = extract_object::<Widget>("widget", root, &ctx, &index)
        .unwrap()
        .unwrap();
    let widget = widget.value.unwrap();
    assert_eq!(widget.name.as_ref().unwrap().value, Some("root".to_string()));
    assert_eq!(widget.size.as_ref().unwrap().value, Some(2));

    let parts = widget.parts.as_ref().unwrap().as_ref().unwrap();
    assert_eq!(parts.len(), 2);
    assert!(parts[1].is_reference());
    assert_eq!(
        parts[1].as_ref().unwrap().size.as_ref().unwrap().value,
        Some(9)
    );

    let links = widget.links.as_ref().unwrap().as_ref().unwrap();
    let keys: Vec<_> = links.keys().map(|k| k.text.clone()).collect();
    assert_eq!(keys, vec!["north", "south"]);
}

#[test]
fn absence_and_error_are_distinct_outcomes() {
    let index = index_json(&json!({"unrelated": 1}));
    let ctx = BuildContext::new();
    let root = index.tree().root_content();

    // Absent label: empty result, no error.
    let absent = extract_object::<Widget>("widget", root, &ctx, &index).unwrap();
    assert!(absent.is_none());

    // Broken reference: an error, not absence.
    let broken = index_json(&json!({"widget": {"$ref": "#/missing"}}));
    let root = broken.tree().root_content();
    let err = extract_object::<Widget>("widget", root, &ctx, &broken).unwrap_err();
    assert!(matches!(err, SpecgraphError::ReferenceNotFound { .. }));
}

#[test]
fn numeric_failure_names_field_and_partial_object_hashes_deterministically() {
    let index = index_json(&json!({
        "widget": {"name": "bob", "size": "not-a-number"}
    }));
    let ctx = BuildContext::new();
    let tree = index.tree();
    let (_, node) = tree.find_key(tree.root_content(), "widget").unwrap();

    let mut widget = Widget::default();
    let err = widget.build(&ctx, None, node, &index).unwrap_err();
    assert_eq!(
        err,
        SpecgraphError::NumericConversionFailed {
            field: "size".to_string(),
            raw: "not-a-number".to_string(),
        }
    );

    // The partially-built object still hashes, and deterministically so.
    let first = widget.content_hash();
    let second = widget.content_hash();
    assert_eq!(first, second);
}

#[test]
fn nested_build_failure_is_wrapped_once_per_level() {
    let index = index_json(&json!({
        "widget": {"links": {"bad": {"size": "NaN-ish"}}}
    }));
    let ctx = BuildContext::new();
    let root = index.tree().root_content();
    let err = extract_object::<Widget>("widget", root, &ctx, &index).unwrap_err();
    assert!(matches!(err, SpecgraphError::BuildFailed(_)));
    assert!(matches!(
        err.root_cause(),
        SpecgraphError::NumericConversionFailed { .. }
    ));
}

#[test]
fn raw_passthrough_hands_back_the_unprocessed_node() {
    let index = index_json(&json!({
        "payload": {"$ref": "#/components/blob"},
        "components": {"blob": {"anything": ["goes", 1, true]}}
    }));
    let root = index.tree().root_content();
    let raw = extract_raw("payload", root, &index).unwrap().unwrap();
    assert!(raw.resolved.followed_pointer());
    let tree = raw.resolved.tree(&index);
    assert!(tree.find_key(raw.resolved.node, "anything").is_some());
}

#[test]
fn map_extraction_through_a_pointer_keeps_the_descriptor() {
    let index = index_json(&json!({
        "widget": {"links": {"$ref": "#/components/linkset"}},
        "components": {"linkset": {"a": {"name": "a"}, "b": {"name": "b"}}}
    }));
    let ctx = BuildContext::new();
    let root = index.tree().root_content();
    let widget = extract_object::<Widget>("widget", root, &ctx, &index)
        .unwrap()
        .unwrap();
    let links = widget.value.unwrap().links.unwrap();
    assert!(links.is_reference());
    assert_eq!(links.as_ref().unwrap().len(), 2);
}

#[test]
fn cancellation_stops_concurrent_extraction_early() {
    let mut body = serde_json::Map::new();
    for i in 0..64 {
        body.insert(format!("k{i:03}"), json!({"name": format!("v{i}")}));
    }
    let index = index_json(&json!({"things": body}));
    let root = index.tree().root_content();

    let ctx = BuildContext::new();
    ctx.cancel();
    // Already-cancelled context: the pool stops enqueueing immediately and
    // the partial (possibly empty) map comes back without error.
    let map = specgraph_core::extract_map_concurrent::<Widget>("things", root, &ctx, &index)
        .unwrap()
        .unwrap();
    assert!(map.as_ref().unwrap().len() < 64);
}

#[test]
fn sequential_and_concurrent_map_extraction_agree() {
    let mut body = serde_json::Map::new();
    for i in 0..32 {
        body.insert(format!("k{i:03}"), json!({"name": format!("v{i}"), "size": i}));
    }
    let index = index_json(&json!({"things": body}));
    let root = index.tree().root_content();
    let ctx = BuildContext::new();

    let sequential = extract_map::<Widget>("things", root, &ctx, &index)
        .unwrap()
        .unwrap();
    let concurrent =
        specgraph_core::extract_map_concurrent::<Widget>("things", root, &ctx, &index)
            .unwrap()
            .unwrap();

    let seq: Vec<(String, u64)> = sequential
        .as_ref()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.text.clone(), v.as_ref().unwrap().content_hash()))
        .collect();
    let con: Vec<(String, u64)> = concurrent
        .as_ref()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.text.clone(), v.as_ref().unwrap().content_hash()))
        .collect();
    assert_eq!(seq, con);
}
