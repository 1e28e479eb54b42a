//! Ordered-map extraction
//!
//! Walks a mapping's key/value pairs in document order, pointer-resolving
//! each value before recursing. The concurrent variant builds values on a
//! bounded worker pool; a single merge stage re-sequences completions so the
//! final container always reflects document order, never completion order.

use tracing::debug;

use crate::errors::{Result, SpecgraphError};
use crate::features::indexing::SpecIndex;
use crate::features::ordered_map::{run_pipeline, Flow, OrderedMap};
use crate::features::resolution::Resolver;
use crate::shared::models::{
    is_extension_key, ExtensionValue, KeyRef, NodeId, NodeKind, ParseTree, ValueRef,
};

use super::context::BuildContext;
use super::extract::build_one;
use super::Buildable;

/// Modeled mapping: ordered keys to built values
pub type ExtractedMap<T> = OrderedMap<KeyRef, ValueRef<T>>;

struct MapSite {
    key: NodeId,
    external: Option<std::sync::Arc<SpecIndex>>,
    node: NodeId,
    reference: Option<crate::shared::models::ReferenceDescriptor>,
}

impl MapSite {
    fn owner<'a>(&'a self, index: &'a SpecIndex) -> &'a SpecIndex {
        self.external.as_deref().unwrap_or(index)
    }
}

fn locate_map(label: &str, parent: NodeId, index: &SpecIndex) -> Result<Option<MapSite>> {
    let tree = index.tree();
    let parent = tree.deref(parent);
    let Some((key, value)) = tree.find_key(parent, label) else {
        return Ok(None);
    };
    let resolved = Resolver::new(index).resolve(value)?;
    let owner = resolved.owner(index);
    if owner.tree().kind(resolved.node) != NodeKind::Mapping {
        return Err(SpecgraphError::NotAMapping {
            pos: owner.tree().span(resolved.node),
        });
    }
    Ok(Some(MapSite {
        key,
        external: resolved.external.clone(),
        node: resolved.node,
        reference: resolved.reference,
    }))
}

fn map_entries(
    tree: &ParseTree,
    node: NodeId,
    include_extensions: bool,
) -> Vec<(String, NodeId, NodeId)> {
    tree.mapping_pairs(node)
        .filter_map(|(key, value)| {
            let text = tree.text(tree.deref(key)).to_string();
            if is_extension_key(&text) && !include_extensions {
                return None;
            }
            Some((text, key, value))
        })
        .collect()
}

fn build_entry<T: Buildable>(
    ctx: &BuildContext,
    owner: &SpecIndex,
    text: &str,
    key: NodeId,
    value: NodeId,
) -> Result<(KeyRef, ValueRef<T>)> {
    let resolved = Resolver::new(owner).resolve(value)?;
    let built = build_one(ctx, Some(key), &resolved, owner)?;
    Ok((KeyRef::new(text, Some(key)), built))
}

fn finish_map<T>(site: MapSite, map: ExtractedMap<T>) -> Option<ValueRef<ExtractedMap<T>>> {
    let mut value_ref = ValueRef::new(map, Some(site.key), Some(site.node));
    if let Some(descriptor) = site.reference {
        value_ref = value_ref.with_reference(descriptor);
    }
    Some(value_ref)
}

/// Sequential ordered-map extraction.
///
/// Vendor-extension keys are skipped unless the context asks for them.
pub fn extract_map<T: Buildable>(
    label: &str,
    parent: NodeId,
    ctx: &BuildContext,
    index: &SpecIndex,
) -> Result<Option<ValueRef<ExtractedMap<T>>>> {
    let Some(site) = locate_map(label, parent, index)? else {
        return Ok(None);
    };
    let owner = site.owner(index);
    let entries = map_entries(owner.tree(), site.node, ctx.include_extensions);
    let mut map = OrderedMap::with_capacity(entries.len());
    for (text, key, value) in entries {
        let (key_ref, built) = build_entry(ctx, owner, &text, key, value)?;
        map.set(key_ref, built);
    }
    Ok(finish_map(site, map))
}

/// Concurrent ordered-map extraction.
///
/// Identical semantics to [`extract_map`]: values build on a bounded worker
/// pool and the merge stage keys the container by original document order.
/// The first fatal child error cancels remaining work and surfaces; maps
/// with fewer than two entries take the sequential path.
pub fn extract_map_concurrent<T: Buildable>(
    label: &str,
    parent: NodeId,
    ctx: &BuildContext,
    index: &SpecIndex,
) -> Result<Option<ValueRef<ExtractedMap<T>>>> {
    let Some(site) = locate_map(label, parent, index)? else {
        return Ok(None);
    };
    let owner = site.owner(index);
    let entries = map_entries(owner.tree(), site.node, ctx.include_extensions);
    if entries.len() < 2 {
        let mut map = OrderedMap::with_capacity(entries.len());
        for (text, key, value) in entries {
            let (key_ref, built) = build_entry(ctx, owner, &text, key, value)?;
            map.set(key_ref, built);
        }
        return Ok(finish_map(site, map));
    }

    let workers = ctx.concurrency.unwrap_or_else(num_cpus::get);
    debug!(entries = entries.len(), workers, "concurrent map extraction");
    let mut map: ExtractedMap<T> = OrderedMap::with_capacity(entries.len());
    let outcome = run_pipeline(
        entries.len(),
        workers,
        |position| {
            if ctx.is_cancelled() {
                return Ok(Flow::Stop);
            }
            let (text, key, value) = &entries[position];
            build_entry(ctx, owner, text, *key, *value).map(Flow::Continue)
        },
        |(key_ref, built)| {
            map.set(key_ref, built);
            Ok(Flow::Continue(()))
        },
    );
    if let Err(err) = outcome {
        ctx.cancel();
        return Err(err);
    }
    Ok(finish_map(site, map))
}

/// Collect vendor extensions from a mapping node.
///
/// Keys carrying the reserved prefix decode into the closed
/// [`ExtensionValue`] union, in document order.
pub fn extract_extensions(
    node: NodeId,
    tree: &ParseTree,
) -> ExtractedMap<ExtensionValue> {
    let mut extensions = OrderedMap::new();
    for (key, value) in tree.mapping_pairs(node) {
        let text = tree.text(tree.deref(key));
        if !is_extension_key(text) {
            continue;
        }
        let decoded = ExtensionValue::decode(tree, value);
        extensions.set(
            KeyRef::new(text, Some(key)),
            ValueRef::new(decoded, Some(key), Some(tree.deref(value))),
        );
    }
    extensions
}
