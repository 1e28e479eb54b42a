//! Vendor extension values
//!
//! Extension fields (keys carrying the reserved `x-` prefix) are opaque
//! metadata: decoded into a closed set of variants, stored separately from
//! structural fields, and never interpreted by the core.

use serde::{Deserialize, Serialize};

use crate::features::ordered_map::OrderedMap;
use crate::shared::models::{NodeId, NodeKind, ParseTree};

/// Reserved key prefix marking a vendor extension
pub const EXTENSION_PREFIX: &str = "x-";

/// True when a mapping key denotes a vendor extension.
pub fn is_extension_key(key: &str) -> bool {
    key.starts_with(EXTENSION_PREFIX)
}

/// Closed union of decoded vendor-extension content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtensionValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Mapping(OrderedMap<String, ExtensionValue>),
    Sequence(Vec<ExtensionValue>),
}

impl ExtensionValue {
    /// Decode a parse-tree node into an extension value.
    pub fn decode(tree: &ParseTree, node: NodeId) -> Self {
        let node = tree.deref(node);
        match tree.kind(node) {
            NodeKind::Scalar => Self::decode_scalar(tree.text(node)),
            NodeKind::Sequence => {
                let items = tree
                    .children(node)
                    .iter()
                    .map(|&child| Self::decode(tree, child))
                    .collect();
                ExtensionValue::Sequence(items)
            }
            NodeKind::Mapping => {
                let mut map = OrderedMap::new();
                for (key, value) in tree.mapping_pairs(node) {
                    let key_text = tree.text(tree.deref(key)).to_string();
                    map.set(key_text, Self::decode(tree, value));
                }
                ExtensionValue::Mapping(map)
            }
            NodeKind::Alias | NodeKind::Document => match tree.children(node).first() {
                Some(&child) => Self::decode(tree, child),
                None => ExtensionValue::Str(String::new()),
            },
        }
    }

    fn decode_scalar(text: &str) -> Self {
        match text {
            "true" => return ExtensionValue::Bool(true),
            "false" => return ExtensionValue::Bool(false),
            _ => {}
        }
        let numeric_shape = text
            .chars()
            .next()
            .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
            .unwrap_or(false);
        if numeric_shape {
            if let Ok(n) = text.parse::<f64>() {
                return ExtensionValue::Number(n);
            }
        }
        ExtensionValue::Str(text.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExtensionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExtensionValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}
