//! Per-type scalar decoding
//!
//! Explicit decode functions for the scalar field shapes, in place of any
//! runtime name inspection. Numeric decoders fail with the field name and
//! the raw text so tools can report the offending value.

use crate::errors::{Result, SpecgraphError};
use crate::shared::models::{NodeId, NodeKind, ParseTree, ValueRef};

fn scalar_value(tree: &ParseTree, parent: NodeId, label: &str) -> Option<(NodeId, NodeId)> {
    let (key, value) = tree.find_key(parent, label)?;
    let value = tree.deref(value);
    (tree.kind(value) == NodeKind::Scalar).then_some((key, value))
}

/// String field. Absent or non-scalar means absent, not an error.
pub fn extract_string(label: &str, parent: NodeId, tree: &ParseTree) -> Option<ValueRef<String>> {
    let (key, value) = scalar_value(tree, parent, label)?;
    Some(ValueRef::new(
        tree.text(value).to_string(),
        Some(key),
        Some(value),
    ))
}

/// Boolean field. Text other than `true`/`false` reads as absent.
pub fn extract_bool(label: &str, parent: NodeId, tree: &ParseTree) -> Option<ValueRef<bool>> {
    let (key, value) = scalar_value(tree, parent, label)?;
    match tree.text(value) {
        "true" => Some(ValueRef::new(true, Some(key), Some(value))),
        "false" => Some(ValueRef::new(false, Some(key), Some(value))),
        _ => None,
    }
}

/// Integer field.
pub fn extract_i64(
    label: &str,
    parent: NodeId,
    tree: &ParseTree,
) -> Result<Option<ValueRef<i64>>> {
    let Some((key, value)) = scalar_value(tree, parent, label) else {
        return Ok(None);
    };
    let raw = tree.text(value);
    let parsed: i64 = raw
        .parse()
        .map_err(|_| SpecgraphError::NumericConversionFailed {
            field: label.to_string(),
            raw: raw.to_string(),
        })?;
    Ok(Some(ValueRef::new(parsed, Some(key), Some(value))))
}

/// Floating-point field.
pub fn extract_f64(
    label: &str,
    parent: NodeId,
    tree: &ParseTree,
) -> Result<Option<ValueRef<f64>>> {
    let Some((key, value)) = scalar_value(tree, parent, label) else {
        return Ok(None);
    };
    let raw = tree.text(value);
    let parsed: f64 = raw
        .parse()
        .map_err(|_| SpecgraphError::NumericConversionFailed {
            field: label.to_string(),
            raw: raw.to_string(),
        })?;
    Ok(Some(ValueRef::new(parsed, Some(key), Some(value))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> ParseTree {
        ParseTree::from_json(&json!({
            "name": "bob",
            "size": 12,
            "weight": 2.5,
            "active": true,
            "bogus": "not-a-number"
        }))
    }

    #[test]
    fn test_scalar_fields_decode() {
        let tree = tree();
        let root = tree.root_content();
        assert_eq!(
            extract_string("name", root, &tree).unwrap().value,
            Some("bob".to_string())
        );
        assert_eq!(extract_i64("size", root, &tree).unwrap().unwrap().value, Some(12));
        assert_eq!(
            extract_f64("weight", root, &tree).unwrap().unwrap().value,
            Some(2.5)
        );
        assert_eq!(extract_bool("active", root, &tree).unwrap().value, Some(true));
    }

    #[test]
    fn test_absent_field_is_none_not_error() {
        let tree = tree();
        let root = tree.root_content();
        assert!(extract_string("missing", root, &tree).is_none());
        assert!(extract_i64("missing", root, &tree).unwrap().is_none());
    }

    #[test]
    fn test_numeric_failure_names_field_and_raw_text() {
        let tree = tree();
        let root = tree.root_content();
        let err = extract_i64("bogus", root, &tree).unwrap_err();
        assert_eq!(
            err,
            SpecgraphError::NumericConversionFailed {
                field: "bogus".to_string(),
                raw: "not-a-number".to_string(),
            }
        );
    }
}
