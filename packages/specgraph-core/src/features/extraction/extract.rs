//! Object, array, and raw extraction
//!
//! Depth-first construction of the raw model graph. Every recursive step
//! follows pointers through the resolver first, so a field body and a
//! pointer to the same body build identically. Label absence is an empty
//! result, never an error.

use crate::errors::{Result, SpecgraphError};
use crate::features::indexing::SpecIndex;
use crate::features::resolution::{pointer_of, Resolved, Resolver};
use crate::shared::models::{NodeId, NodeKind, ValueRef};

use super::context::BuildContext;
use super::Buildable;

/// Raw passthrough result for document-defined "any" fields
#[derive(Debug, Clone)]
pub struct RawField {
    pub key_node: Option<NodeId>,
    /// The pointer-resolved node, unprocessed, with its owning index
    pub resolved: Resolved,
}

pub(super) fn build_one<T: Buildable>(
    ctx: &BuildContext,
    key_node: Option<NodeId>,
    resolved: &Resolved,
    index: &SpecIndex,
) -> Result<ValueRef<T>> {
    let mut value = T::default();
    if resolved.circular_journey.is_none() {
        let owner = resolved.owner(index);
        value
            .build(ctx, key_node, resolved.node, owner)
            .map_err(SpecgraphError::nested)?;
    }
    // A tolerated cycle stops expanding here: the descriptor still points at
    // the loop, so renderers re-emit the pointer instead of the content.
    let mut value_ref = ValueRef::new(value, key_node, Some(resolved.node));
    if let Some(descriptor) = resolved.reference.clone() {
        value_ref = value_ref.with_reference(descriptor);
    }
    Ok(value_ref)
}

/// Extract a labeled child object, following pointers.
///
/// When the parent node is itself a pointer, the resolved node is the
/// object; otherwise the labeled child is located, resolved, and built.
pub fn extract_object<T: Buildable>(
    label: &str,
    parent: NodeId,
    ctx: &BuildContext,
    index: &SpecIndex,
) -> Result<Option<ValueRef<T>>> {
    let tree = index.tree();
    let parent = tree.deref(parent);
    let resolver = Resolver::new(index);

    if pointer_of(tree, parent).is_some() {
        let resolved = resolver.resolve(parent)?;
        return Ok(Some(build_one(ctx, None, &resolved, index)?));
    }

    let Some((key, value)) = tree.find_key(parent, label) else {
        return Ok(None);
    };
    let resolved = resolver.resolve(value)?;
    Ok(Some(build_one(ctx, Some(key), &resolved, index)?))
}

/// Confirm the resolved value is a sequence.
///
/// A value reached only through a pointer gets one nested-label retry: the
/// pointer may land on a wrapper mapping that nests the sequence under the
/// same label.
fn ensure_sequence(first: Resolved, label: &str, index: &SpecIndex) -> Result<Resolved> {
    let owner = first.owner(index);
    if owner.tree().kind(first.node) == NodeKind::Sequence {
        return Ok(first);
    }
    if first.followed_pointer() {
        if let Some((_, nested_node)) = owner.tree().find_key(first.node, label) {
            let mut nested = Resolver::new(owner).resolve(nested_node)?;
            if nested.external.is_none() {
                nested.external = first.external.clone();
            }
            if nested.owner(index).tree().kind(nested.node) == NodeKind::Sequence {
                if nested.reference.is_none() {
                    nested.reference = first.reference.clone();
                }
                return Ok(nested);
            }
        }
    }
    Err(SpecgraphError::NotASequence {
        pos: owner.tree().span(first.node),
    })
}

/// Raw passthrough: locate, pointer-resolve, hand the node back unprocessed
/// for the consumer to interpret.
pub fn extract_raw(label: &str, parent: NodeId, index: &SpecIndex) -> Result<Option<RawField>> {
    let tree = index.tree();
    let parent = tree.deref(parent);
    let Some((key, value)) = tree.find_key(parent, label) else {
        return Ok(None);
    };
    let resolved = Resolver::new(index).resolve(value)?;
    Ok(Some(RawField {
        key_node: Some(key),
        resolved,
    }))
}

/// Extract a labeled array, building one child per entry.
///
/// The resolved value must be a sequence. When the sequence was reached
/// only through a pointer, one nested-label retry runs before failing with
/// `NotASequence`. Entries are pointer-resolved independently before
/// recursing.
pub fn extract_array<T: Buildable>(
    label: &str,
    parent: NodeId,
    ctx: &BuildContext,
    index: &SpecIndex,
) -> Result<Option<ValueRef<Vec<ValueRef<T>>>>> {
    let tree = index.tree();
    let parent = tree.deref(parent);
    let Some((key, value)) = tree.find_key(parent, label) else {
        return Ok(None);
    };

    let resolver = Resolver::new(index);
    let first = resolver.resolve(value)?;
    let resolved = ensure_sequence(first, label, index)?;

    let owner = resolved.owner(index);
    let entries = owner.tree().children(resolved.node).to_vec();
    let entry_resolver = Resolver::new(owner);
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry_resolved = entry_resolver.resolve(entry)?;
        items.push(build_one(ctx, None, &entry_resolved, owner)?);
    }

    let mut value_ref = ValueRef::new(items, Some(key), Some(resolved.node));
    if let Some(descriptor) = resolved.reference.clone() {
        value_ref = value_ref.with_reference(descriptor);
    }
    Ok(Some(value_ref))
}
