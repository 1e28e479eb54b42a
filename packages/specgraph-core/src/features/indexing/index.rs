//! Per-document reference index
//!
//! One walk over the parse tree records every addressable sub-tree under its
//! fragment path, files recognized component sections into their categories,
//! and collects every pointer node found along the way. The index is built
//! exactly once and is read-only afterwards, so concurrent readers need no
//! locking.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::features::resolution::reference::pointer_of;
use crate::shared::models::{NodeId, NodeKind, ParseTree};

use super::config::{BaseLocation, IndexConfig};

/// Fixed-priority reference categories
///
/// Lookup searches categories in declaration order; the first exact string
/// match wins. `Mapped` holds every addressable fragment path and is the
/// generic fallback between the dialect-specific sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefCategory {
    Schemas,
    Mapped,
    ExternalDocs,
    Parameters,
    Headers,
    Callbacks,
    Links,
    Examples,
    RequestBodies,
    Responses,
    SecuritySchemes,
}

impl RefCategory {
    /// Search order for resolution
    pub const PRIORITY: [RefCategory; 11] = [
        RefCategory::Schemas,
        RefCategory::Mapped,
        RefCategory::ExternalDocs,
        RefCategory::Parameters,
        RefCategory::Headers,
        RefCategory::Callbacks,
        RefCategory::Links,
        RefCategory::Examples,
        RefCategory::RequestBodies,
        RefCategory::Responses,
        RefCategory::SecuritySchemes,
    ];

    /// Category for a component-section key, if the key is recognized.
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "schemas" | "definitions" => Some(RefCategory::Schemas),
            "parameters" => Some(RefCategory::Parameters),
            "headers" => Some(RefCategory::Headers),
            "callbacks" => Some(RefCategory::Callbacks),
            "links" => Some(RefCategory::Links),
            "examples" => Some(RefCategory::Examples),
            "requestBodies" => Some(RefCategory::RequestBodies),
            "responses" => Some(RefCategory::Responses),
            "securitySchemes" | "securityDefinitions" => Some(RefCategory::SecuritySchemes),
            _ => None,
        }
    }
}

/// Escape a path segment for use in a fragment (`~` → `~0`, `/` → `~1`).
fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Per-document lookup table from reference strings to target nodes
pub struct SpecIndex {
    tree: Arc<ParseTree>,
    config: IndexConfig,
    categories: AHashMap<RefCategory, AHashMap<String, NodeId>>,
    reference_nodes: Vec<(String, NodeId)>,
    externals: Vec<Arc<SpecIndex>>,
}

impl SpecIndex {
    /// Walk the document once and build the lookup tables.
    pub fn build(
        tree: Arc<ParseTree>,
        config: IndexConfig,
        externals: Vec<Arc<SpecIndex>>,
    ) -> Self {
        let mut index = Self {
            tree: Arc::clone(&tree),
            config,
            categories: AHashMap::new(),
            reference_nodes: Vec::new(),
            externals,
        };
        if !tree.is_empty() {
            let root = tree.root_content();
            index.record("#".to_string(), root, None);
            let mut path = Vec::new();
            index.walk(&tree, root, &mut path);
        }
        debug!(
            addressable = index.mapped_len(),
            pointers = index.reference_nodes.len(),
            "index built"
        );
        index
    }

    fn walk(&mut self, tree: &ParseTree, node: NodeId, path: &mut Vec<String>) {
        let node = tree.deref(node);
        match tree.kind(node) {
            NodeKind::Mapping => {
                if let Some((reference, _)) = pointer_of(tree, node) {
                    self.reference_nodes.push((reference, node));
                }
                let pairs: Vec<_> = tree.mapping_pairs(node).collect();
                for (key, value) in pairs {
                    let segment = escape_segment(tree.text(tree.deref(key)));
                    path.push(segment);
                    let fragment = format!("#/{}", path.join("/"));
                    let category = path
                        .len()
                        .checked_sub(2)
                        .and_then(|i| RefCategory::from_segment(&path[i]));
                    let target = tree.deref(value);
                    self.record(fragment, target, category);
                    self.walk(tree, value, path);
                    path.pop();
                }
            }
            NodeKind::Sequence => {
                let children: Vec<_> = tree.children(node).to_vec();
                for (position, child) in children.into_iter().enumerate() {
                    path.push(position.to_string());
                    let fragment = format!("#/{}", path.join("/"));
                    self.record(fragment, tree.deref(child), None);
                    self.walk(tree, child, path);
                    path.pop();
                }
            }
            NodeKind::Document => {
                let children: Vec<_> = tree.children(node).to_vec();
                for child in children {
                    self.walk(tree, child, path);
                }
            }
            NodeKind::Scalar | NodeKind::Alias => {}
        }
    }

    fn record(&mut self, fragment: String, node: NodeId, category: Option<RefCategory>) {
        if let Some(category) = category {
            self.categories
                .entry(category)
                .or_default()
                .insert(fragment.clone(), node);
        }
        self.categories
            .entry(RefCategory::Mapped)
            .or_default()
            .insert(fragment, node);
    }

    fn mapped_len(&self) -> usize {
        self.categories
            .get(&RefCategory::Mapped)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Exact lookup in one category.
    pub fn lookup(&self, category: RefCategory, reference: &str) -> Option<NodeId> {
        self.categories
            .get(&category)?
            .get(reference)
            .copied()
    }

    /// Number of addressable sub-trees recorded by the walk.
    pub fn resolved_count(&self) -> usize {
        self.mapped_len()
    }

    /// Every pointer node found in the document, with its reference string,
    /// in document order.
    pub fn reference_nodes(&self) -> &[(String, NodeId)] {
        &self.reference_nodes
    }

    pub fn tree(&self) -> &Arc<ParseTree> {
        &self.tree
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn allow_circular(&self) -> bool {
        self.config.allow_circular
    }

    pub fn location(&self) -> Option<&BaseLocation> {
        self.config.location.as_ref()
    }

    pub fn externals(&self) -> &[Arc<SpecIndex>] {
        &self.externals
    }

    /// Match an external document part against the sibling indices.
    ///
    /// A sibling matches when its configured location equals the document
    /// part exactly, or when its file name does (the relative-reference
    /// shorthand).
    pub fn find_external(&self, document: &str) -> Option<&Arc<SpecIndex>> {
        self.externals.iter().find(|external| {
            external
                .location()
                .map(|location| {
                    location.as_str() == document
                        || location.file_name() == Some(document)
                })
                .unwrap_or(false)
        })
    }
}

impl std::fmt::Debug for SpecIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecIndex")
            .field("addressable", &self.mapped_len())
            .field("pointers", &self.reference_nodes.len())
            .field("externals", &self.externals.len())
            .finish()
    }
}
