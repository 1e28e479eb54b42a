//! Shared models

mod extension;
mod parse_tree;
mod span;
mod value_ref;

pub use extension::{is_extension_key, ExtensionValue, EXTENSION_PREFIX};
pub use parse_tree::{NodeId, NodeKind, ParseTree, TreeBuilder};
pub use span::{Location, Span};
pub use value_ref::{KeyRef, ReferenceDescriptor, ValueRef};
