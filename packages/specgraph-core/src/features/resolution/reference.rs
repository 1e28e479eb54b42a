//! Pointer syntax and structural queries
//!
//! A pointer is a mapping holding the reserved `$ref` key with a string
//! value. Reference strings split on the fragment separator into an optional
//! document part and an optional fragment; fragments address nodes with `/`
//! descent and the `~0`/`~1` escapes.

use crate::shared::models::{NodeId, NodeKind, ParseTree};

/// Reserved key marking a pointer mapping
pub const REFERENCE_KEY: &str = "$ref";

/// Detect pointer syntax on a node.
///
/// Returns the reference string and the scalar node holding it. The key
/// match is exact; case variants of `$ref` are ordinary fields.
pub fn pointer_of(tree: &ParseTree, node: NodeId) -> Option<(String, NodeId)> {
    let node = tree.deref(node);
    if tree.kind(node) != NodeKind::Mapping {
        return None;
    }
    for (key, value) in tree.mapping_pairs(node) {
        if tree.text(tree.deref(key)) == REFERENCE_KEY {
            let value = tree.deref(value);
            if tree.kind(value) == NodeKind::Scalar {
                return Some((tree.text(value).to_string(), value));
            }
            return None;
        }
    }
    None
}

/// Split a reference on the fragment separator.
///
/// `#/a/b` → `(None, Some("/a/b"))`; `doc.yaml#/a` →
/// `(Some("doc.yaml"), Some("/a"))`; `doc.yaml` → `(Some("doc.yaml"), None)`.
pub fn split_reference(reference: &str) -> (Option<&str>, Option<&str>) {
    match reference.split_once('#') {
        Some((document, fragment)) => {
            let document = (!document.is_empty()).then_some(document);
            let fragment = (!fragment.is_empty()).then_some(fragment);
            (document, fragment)
        }
        None => ((!reference.is_empty()).then_some(reference), None),
    }
}

/// Undo fragment escaping: `~1` → `/`, then `~0` → `~`.
fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Evaluate a fragment as a structural query against the tree.
///
/// `/` descends into mapping values by key and sequence entries by index.
/// The empty fragment addresses the document content.
pub fn query(tree: &ParseTree, fragment: &str) -> Option<NodeId> {
    let mut current = tree.root_content();
    for segment in fragment.split('/').skip_while(|s| s.is_empty()) {
        let segment = unescape_segment(segment);
        current = tree.deref(current);
        match tree.kind(current) {
            NodeKind::Mapping => {
                let mut found = None;
                for (key, value) in tree.mapping_pairs(current) {
                    if tree.text(tree.deref(key)) == segment {
                        found = Some(value);
                        break;
                    }
                }
                current = found?;
            }
            NodeKind::Sequence => {
                let position: usize = segment.parse().ok()?;
                current = *tree.children(current).get(position)?;
            }
            _ => return None,
        }
    }
    Some(tree.deref(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_pointer_detection() {
        let tree = ParseTree::from_json(&json!({"$ref": "#/a/b"}));
        let (reference, _) = pointer_of(&tree, tree.root_content()).unwrap();
        assert_eq!(reference, "#/a/b");

        let plain = ParseTree::from_json(&json!({"name": "x"}));
        assert!(pointer_of(&plain, plain.root_content()).is_none());
    }

    #[test]
    fn test_split_reference_forms() {
        assert_eq!(split_reference("#/a/b"), (None, Some("/a/b")));
        assert_eq!(
            split_reference("doc.yaml#/a"),
            (Some("doc.yaml"), Some("/a"))
        );
        assert_eq!(split_reference("doc.yaml"), (Some("doc.yaml"), None));
        assert_eq!(split_reference(""), (None, None));
    }

    #[test]
    fn test_query_descends_mappings_and_sequences() {
        let tree = ParseTree::from_json(&json!({
            "a": {"b": [{"c": 41}, {"c": 42}]}
        }));
        let node = query(&tree, "/a/b/1/c").unwrap();
        assert_eq!(tree.text(node), "42");
    }

    #[test]
    fn test_query_unescapes_segments() {
        let tree = ParseTree::from_json(&json!({
            "paths": {"/pets": {"get": "op"}, "til~de": 7}
        }));
        let get = query(&tree, "/paths/~1pets/get").unwrap();
        assert_eq!(tree.text(get), "op");
        let tilde = query(&tree, "/paths/til~0de").unwrap();
        assert_eq!(tree.text(tilde), "7");
    }

    #[test]
    fn test_query_miss_is_none() {
        let tree = ParseTree::from_json(&json!({"a": 1}));
        assert!(query(&tree, "/b").is_none());
        assert!(query(&tree, "/a/deeper").is_none());
    }
}
