//! Content fingerprinting
//!
//! A stable 64-bit fingerprint over a modeled sub-graph, for cheap
//! equivalence and diff checks. Two independently parsed copies of
//! byte-identical input hash identically; that is a correctness property the
//! tests pin down, not incidental behavior.

use crate::features::extraction::ExtractedMap;
use crate::features::ordered_map::OrderedMap;
use crate::shared::models::{ExtensionValue, KeyRef, NodeId, NodeKind, ParseTree, ValueRef};

/// Delimiter written after every scalar contribution, so adjacent fields
/// cannot collide by concatenation ("ab"+"" vs "a"+"b").
pub const HASH_DELIMITER: u8 = b'|';

/// Every modeled type exposes a 64-bit content fingerprint.
///
/// Composition is mandatory: a parent's hash incorporates every child's
/// hash.
pub trait Hashable {
    fn content_hash(&self) -> u64;
}

/// Incremental fingerprint builder
///
/// Present scalar fields contribute their textual form plus a delimiter;
/// absent fields contribute nothing; nested objects contribute their own
/// recursively-computed fingerprint.
#[derive(Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// One scalar contribution: text then delimiter.
    pub fn write_scalar(&mut self, text: &str) {
        self.inner.update(text.as_bytes());
        self.inner.update(&[HASH_DELIMITER]);
    }

    /// One child-fingerprint contribution.
    pub fn write_hash(&mut self, hash: u64) {
        self.inner.update(&hash.to_le_bytes());
        self.inner.update(&[HASH_DELIMITER]);
    }

    pub fn write_child<H: Hashable>(&mut self, child: &H) {
        self.write_hash(child.content_hash());
    }

    /// Present child contributes its fingerprint; absent contributes
    /// nothing.
    pub fn write_child_ref<H: Hashable>(&mut self, value: &ValueRef<H>) {
        if let Some(child) = value.as_ref() {
            self.write_hash(child.content_hash());
        }
    }

    pub fn write_opt_child<H: Hashable>(&mut self, value: &Option<ValueRef<H>>) {
        if let Some(value) = value {
            self.write_child_ref(value);
        }
    }

    /// Present scalar field in textual form; absent contributes nothing.
    pub fn write_field<T: std::fmt::Display>(&mut self, value: &Option<ValueRef<T>>) {
        if let Some(value) = value {
            if let Some(inner) = value.as_ref() {
                self.write_scalar(&inner.to_string());
            }
        }
    }

    /// Recursive raw-node contribution.
    ///
    /// Scalars hash by text; mapping and sequence children hash in document
    /// order; aliases hash through to their target, so an anchor and its
    /// expansion hash identically.
    pub fn write_node(&mut self, tree: &ParseTree, node: NodeId) {
        let node = tree.deref(node);
        match tree.kind(node) {
            NodeKind::Scalar => self.write_scalar(tree.text(node)),
            NodeKind::Mapping | NodeKind::Sequence | NodeKind::Document => {
                for &child in tree.children(node) {
                    self.write_node(tree, child);
                }
            }
            // deref never answers with an alias unless its target is gone
            NodeKind::Alias => {}
        }
    }

    /// Vendor-extension contribution, sorted alphabetically by key.
    ///
    /// Extension order is metadata, not structure; it must not affect the
    /// fingerprint.
    pub fn write_extensions(&mut self, extensions: &ExtractedMap<ExtensionValue>) {
        let mut keys: Vec<&KeyRef> = extensions.keys().collect();
        keys.sort_by(|a, b| a.text.cmp(&b.text));
        for key in keys {
            self.write_scalar(&key.text);
            if let Some(value) = extensions.get(key.as_str()).and_then(ValueRef::as_ref) {
                self.write_extension_value(value);
            }
        }
    }

    fn write_extension_value(&mut self, value: &ExtensionValue) {
        match value {
            ExtensionValue::Str(s) => self.write_scalar(s),
            ExtensionValue::Number(n) => self.write_scalar(&n.to_string()),
            ExtensionValue::Bool(b) => self.write_scalar(if *b { "true" } else { "false" }),
            ExtensionValue::Sequence(items) => {
                for item in items {
                    self.write_extension_value(item);
                }
            }
            ExtensionValue::Mapping(map) => {
                for (key, nested) in map {
                    self.write_scalar(key);
                    self.write_extension_value(nested);
                }
            }
        }
    }

    /// Finalize to the 64-bit fingerprint.
    pub fn finish(self) -> u64 {
        let digest = self.inner.finalize();
        let bytes = digest.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

impl<K: std::hash::Hash + Eq, V: Hashable> Hashable for OrderedMap<K, V> {
    fn content_hash(&self) -> u64 {
        let mut hasher = ContentHasher::new();
        for (_, value) in self.iter() {
            hasher.write_hash(value.content_hash());
        }
        hasher.finish()
    }
}

impl<H: Hashable> Hashable for ValueRef<H> {
    fn content_hash(&self) -> u64 {
        match self.as_ref() {
            Some(value) => value.content_hash(),
            None => 0,
        }
    }
}
