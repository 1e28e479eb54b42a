//! Resolver feature
//!
//! Pointer syntax detection, reference-string normalization, and the
//! resolver that turns pointer nodes into target nodes.

pub mod reference;
mod resolver;

pub use reference::{pointer_of, query, split_reference, REFERENCE_KEY};
pub use resolver::{Resolved, Resolver};
