/*
 * specgraph-core - Typed document model construction engine
 *
 * Feature-First Architecture:
 * - shared/      : Common models (ParseTree, ValueRef, Span, extensions)
 * - features/    : Vertical slices (ordered_map → indexing → resolution →
 *                  extraction → hashing)
 *
 * Converts untyped document trees into richly-typed in-memory models while
 * resolving internal and cross-document pointers and safely handling cyclic
 * references. Dialect vocabularies, re-serialization, and CLI concerns live
 * outside this crate and consume it through the Build contract.
 */

#![allow(clippy::new_without_default)] // Default impl not always wanted
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::collapsible_if)] // Readability over brevity

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use errors::{Result, SpecgraphError};

pub use shared::models::{
    is_extension_key, ExtensionValue, KeyRef, Location, NodeId, NodeKind, ParseTree,
    ReferenceDescriptor, Span, TreeBuilder, ValueRef, EXTENSION_PREFIX,
};

pub use features::extraction::{
    extract_array, extract_bool, extract_extensions, extract_f64, extract_i64, extract_map,
    extract_map_concurrent, extract_object, extract_raw, extract_string, BuildContext, Buildable,
    ExtractedMap, RawField,
};
pub use features::hashing::{ContentHasher, Hashable, HASH_DELIMITER};
pub use features::indexing::{BaseLocation, IndexConfig, RefCategory, SpecIndex, DEFAULT_MAX_DEPTH};
pub use features::ordered_map::{Flow, OrderedMap};
pub use features::resolution::{Resolved, Resolver, REFERENCE_KEY};
