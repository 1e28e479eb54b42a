//! Pointer resolution
//!
//! Turns a pointer node into a concrete target node or a precise error:
//! category-priority index search, bounded re-resolution when the target is
//! itself a pointer, cycle detection with a human-readable journey, base
//! normalization for document-relative references, and a structural-query
//! fallback against the root tree.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{Result, SpecgraphError};
use crate::features::indexing::{BaseLocation, RefCategory, SpecIndex};
use crate::shared::models::{NodeId, ParseTree, ReferenceDescriptor};

use super::reference::{pointer_of, query, split_reference};

/// Result of resolving one node
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The concrete target node
    pub node: NodeId,
    /// The sibling index the node lives in, when resolution crossed into an
    /// external document; `None` means the entry document
    pub external: Option<Arc<SpecIndex>>,
    /// The first pointer followed, for re-emitting the reference
    pub reference: Option<ReferenceDescriptor>,
    /// Journey of a tolerated cycle, when one was swallowed
    pub circular_journey: Option<Vec<String>>,
}

impl Resolved {
    /// The index that owns `node`.
    pub fn owner<'a>(&'a self, local: &'a SpecIndex) -> &'a SpecIndex {
        self.external.as_deref().unwrap_or(local)
    }

    /// The tree that owns `node`.
    pub fn tree<'a>(&'a self, local: &'a SpecIndex) -> &'a Arc<ParseTree> {
        self.owner(local).tree()
    }

    pub fn followed_pointer(&self) -> bool {
        self.reference.is_some()
    }
}

/// Where a lookup found its target
enum Located {
    /// In the document currently being resolved
    Current(NodeId),
    /// In the entry document (structural-query fallback)
    Root(NodeId),
    /// In a sibling external document
    External(NodeId, Arc<SpecIndex>),
}

/// Stateless pointer resolver over one entry index
///
/// Resolution is deterministic: the same reference string against the same
/// index always lands on the same node.
pub struct Resolver<'a> {
    index: &'a SpecIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SpecIndex) -> Self {
        Self { index }
    }

    /// Resolve a node, following pointer chains through to a concrete
    /// target.
    ///
    /// Non-pointer nodes resolve to themselves. A cycle either fails with
    /// the full journey or, under circular tolerance, returns the
    /// partially-expanded target with the journey recorded.
    pub fn resolve(&self, node: NodeId) -> Result<Resolved> {
        let mut seen: Vec<String> = Vec::new();
        let mut descriptor: Option<ReferenceDescriptor> = None;
        self.resolve_step(self.index, None, node, &mut seen, &mut descriptor)
    }

    fn resolve_step(
        &self,
        current: &SpecIndex,
        external: Option<Arc<SpecIndex>>,
        node: NodeId,
        seen: &mut Vec<String>,
        descriptor: &mut Option<ReferenceDescriptor>,
    ) -> Result<Resolved> {
        let tree = current.tree();
        let node = tree.deref(node);
        let Some((reference, ref_node)) = pointer_of(tree, node) else {
            return Ok(Resolved {
                node,
                external,
                reference: descriptor.clone(),
                circular_journey: None,
            });
        };
        if reference.is_empty() {
            return Err(SpecgraphError::EmptyReference);
        }
        if descriptor.is_none() {
            *descriptor = Some(ReferenceDescriptor {
                reference: reference.clone(),
                node,
            });
        }

        if let Some(start) = seen.iter().position(|r| r == &reference) {
            let mut journey = seen[start..].to_vec();
            journey.push(reference.clone());
            if self.index.allow_circular() {
                warn!(
                    journey = %journey.join(" -> "),
                    "tolerated circular reference"
                );
                let located = self.locate(current, &reference, ref_node)?;
                let (target, target_external) = match located {
                    Located::Current(target) => (target, external),
                    Located::Root(target) => (target, None),
                    Located::External(target, ext) => (target, Some(ext)),
                };
                return Ok(Resolved {
                    node: target,
                    external: target_external,
                    reference: descriptor.clone(),
                    circular_journey: Some(journey),
                });
            }
            return Err(SpecgraphError::CircularReference {
                journey,
                pos: tree.span(ref_node),
            });
        }

        let max_depth = self.index.config().max_depth;
        if seen.len() as u32 >= max_depth {
            return Err(SpecgraphError::ReferenceTooDeep { depth: max_depth });
        }
        seen.push(reference.clone());

        match self.locate(current, &reference, ref_node)? {
            Located::Current(target) => self.resolve_step(current, external, target, seen, descriptor),
            Located::Root(target) => self.resolve_step(self.index, None, target, seen, descriptor),
            Located::External(target, ext) => {
                let owner = Arc::clone(&ext);
                self.resolve_step(owner.as_ref(), Some(ext), target, seen, descriptor)
            }
        }
    }

    /// Steps 2, 5, 6, 7 of the resolution algorithm.
    fn locate(
        &self,
        current: &SpecIndex,
        reference: &str,
        ref_node: NodeId,
    ) -> Result<Located> {
        // Exact category-priority search; external documents take their
        // fixed place in the order.
        for category in RefCategory::PRIORITY {
            if category == RefCategory::ExternalDocs {
                if let Some((node, external)) = self.lookup_external(current, reference) {
                    debug!(reference = %reference, "resolved in external document");
                    return Ok(Located::External(node, external));
                }
                continue;
            }
            if let Some(node) = current.lookup(category, reference) {
                return Ok(Located::Current(node));
            }
        }

        // Relative document part: normalize against the known bases, in
        // order, then retry the external search.
        let (document, fragment) = split_reference(reference);
        if let Some(document) = document {
            let mut bases: Vec<&BaseLocation> = Vec::new();
            if let Some(location) = current.location() {
                bases.push(location);
            }
            if let Some(location) = self.index.location() {
                bases.push(location);
            }
            if let Some(base) = self.index.config().base_url.as_ref() {
                bases.push(base);
            }
            for base in bases {
                let normalized_document = base.join(document);
                let normalized = match fragment {
                    Some(fragment) => format!("{normalized_document}#{fragment}"),
                    None => normalized_document,
                };
                if let Some((node, external)) = self.lookup_external(current, &normalized) {
                    debug!(reference = %reference, normalized = %normalized, "resolved after base normalization");
                    return Ok(Located::External(node, external));
                }
            }
        }

        // Last resort: evaluate the fragment as a structural query against
        // the root tree.
        if document.is_none() {
            if let Some(fragment) = fragment {
                if let Some(node) = query(self.index.tree(), fragment) {
                    debug!(reference = %reference, "resolved by structural query");
                    return Ok(Located::Root(node));
                }
            }
        }

        Err(SpecgraphError::ReferenceNotFound {
            reference: reference.to_string(),
            pos: current.tree().span(ref_node),
        })
    }

    fn lookup_external(
        &self,
        current: &SpecIndex,
        reference: &str,
    ) -> Option<(NodeId, Arc<SpecIndex>)> {
        let (document, fragment) = split_reference(reference);
        let document = document?;
        let external = current
            .find_external(document)
            .or_else(|| self.index.find_external(document))?;
        let node = match fragment {
            Some(fragment) => external
                .lookup(RefCategory::Mapped, &format!("#{fragment}"))
                .or_else(|| query(external.tree(), fragment))?,
            None => external.tree().root_content(),
        };
        Some((node, Arc::clone(external)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::indexing::IndexConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build_index(value: serde_json::Value, config: IndexConfig) -> SpecIndex {
        let tree = Arc::new(ParseTree::from_json(&value));
        SpecIndex::build(tree, config, Vec::new())
    }

    #[test]
    fn test_non_pointer_resolves_to_itself() {
        let index = build_index(json!({"name": "x"}), IndexConfig::default());
        let resolver = Resolver::new(&index);
        let root = index.tree().root_content();
        let resolved = resolver.resolve(root).unwrap();
        assert_eq!(resolved.node, root);
        assert!(resolved.reference.is_none());
    }

    #[test]
    fn test_pointer_chain_lands_on_concrete_node() {
        // a is itself a pointer; resolving a pointer to a yields b's node.
        let index = build_index(
            json!({
                "entry": {"$ref": "#/components/widgets/a"},
                "components": {"widgets": {
                    "a": {"$ref": "#/components/widgets/b"},
                    "b": {"name": "concrete"}
                }}
            }),
            IndexConfig::default(),
        );
        let resolver = Resolver::new(&index);
        let tree = index.tree();
        let (_, entry) = tree.find_key(tree.root_content(), "entry").unwrap();

        let resolved = resolver.resolve(entry).unwrap();
        let expected = index
            .lookup(RefCategory::Mapped, "#/components/widgets/b")
            .unwrap();
        assert_eq!(resolved.node, expected);
        // The descriptor re-emits the original pointer.
        assert_eq!(
            resolved.reference.unwrap().reference,
            "#/components/widgets/a"
        );
    }

    #[test]
    fn test_empty_reference_is_an_error() {
        let index = build_index(json!({"entry": {"$ref": ""}}), IndexConfig::default());
        let resolver = Resolver::new(&index);
        let tree = index.tree();
        let (_, entry) = tree.find_key(tree.root_content(), "entry").unwrap();
        assert_eq!(
            resolver.resolve(entry).unwrap_err(),
            SpecgraphError::EmptyReference
        );
    }

    #[test]
    fn test_structural_query_fallback() {
        // "#/deep/00/value" is not an indexed spelling (the walk records
        // "#/deep/0/value"), so only the structural query can find it.
        let index = build_index(
            json!({
                "entry": {"$ref": "#/deep/00/value"},
                "deep": [{"value": {"name": "found"}}]
            }),
            IndexConfig::default(),
        );
        let resolver = Resolver::new(&index);
        let tree = index.tree();
        let (_, entry) = tree.find_key(tree.root_content(), "entry").unwrap();
        let resolved = resolver.resolve(entry).unwrap();
        let (_, name) = tree.find_key(resolved.node, "name").unwrap();
        assert_eq!(tree.text(tree.deref(name)), "found");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let index = build_index(
            json!({
                "entry": {"$ref": "#/components/schemas/Pet"},
                "components": {"schemas": {"Pet": {"type": "object"}}}
            }),
            IndexConfig::default(),
        );
        let resolver = Resolver::new(&index);
        let tree = index.tree();
        let (_, entry) = tree.find_key(tree.root_content(), "entry").unwrap();
        let first = resolver.resolve(entry).unwrap();
        let second = resolver.resolve(entry).unwrap();
        assert_eq!(first.node, second.node);
    }
}
