//! Shared test fixtures: a small modeled type exercising the full pipeline.
#![allow(dead_code)]

use specgraph_core::{
    extract_array, extract_extensions, extract_i64, extract_map, extract_string, BuildContext,
    Buildable, ContentHasher, ExtensionValue, ExtractedMap, Hashable, IndexConfig, NodeId,
    ParseTree, Result, SpecIndex, ValueRef,
};
use std::sync::Arc;

/// A dialect-agnostic modeled object: scalar fields, a child array, a child
/// map, and vendor extensions.
#[derive(Debug, Default)]
pub struct Widget {
    pub name: Option<ValueRef<String>>,
    pub size: Option<ValueRef<i64>>,
    pub parts: Option<ValueRef<Vec<ValueRef<Widget>>>>,
    pub links: Option<ValueRef<ExtractedMap<Widget>>>,
    pub extensions: ExtractedMap<ExtensionValue>,
}

impl Buildable for Widget {
    fn build(
        &mut self,
        ctx: &BuildContext,
        _key: Option<NodeId>,
        node: NodeId,
        index: &SpecIndex,
    ) -> Result<()> {
        let tree = index.tree();
        self.name = extract_string("name", node, tree);
        self.size = extract_i64("size", node, tree)?;
        self.parts = extract_array("parts", node, ctx, index)?;
        self.links = extract_map("links", node, ctx, index)?;
        self.extensions = extract_extensions(node, tree);
        Ok(())
    }
}

impl Hashable for Widget {
    fn content_hash(&self) -> u64 {
        let mut hasher = ContentHasher::new();
        hasher.write_field(&self.name);
        hasher.write_field(&self.size);
        if let Some(parts) = self.parts.as_ref().and_then(ValueRef::as_ref) {
            for part in parts {
                hasher.write_child_ref(part);
            }
        }
        if let Some(links) = self.links.as_ref().and_then(ValueRef::as_ref) {
            hasher.write_child(links);
        }
        hasher.write_extensions(&self.extensions);
        hasher.finish()
    }
}

/// Index a JSON document with the default configuration.
pub fn index_json(value: &serde_json::Value) -> SpecIndex {
    index_json_with(value, IndexConfig::default())
}

/// Index a JSON document with explicit configuration.
pub fn index_json_with(value: &serde_json::Value, config: IndexConfig) -> SpecIndex {
    let tree = Arc::new(ParseTree::from_json(value));
    SpecIndex::build(tree, config, Vec::new())
}
