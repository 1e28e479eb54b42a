//! Typed references into the parse tree
//!
//! A [`ValueRef`] owns a decoded value and keeps non-owning links (arena ids)
//! to the key and value nodes it was decoded from, for diagnostics and
//! round-tripping. Equality is value equality only; node identity never
//! participates, so two anchors of one alias compare equal.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

use super::parse_tree::NodeId;

/// Records that an object was reached through a pointer, so a renderer can
/// re-emit the pointer instead of the expanded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    /// The original reference string, verbatim
    pub reference: String,
    /// The pointer node the reference string came from
    pub node: NodeId,
}

/// Owned decoded value plus links to its originating nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueRef<T> {
    pub value: Option<T>,
    pub key_node: Option<NodeId>,
    pub value_node: Option<NodeId>,
    /// Present iff the value was reached by following a pointer
    pub reference: Option<ReferenceDescriptor>,
}

impl<T> ValueRef<T> {
    pub fn new(value: T, key_node: Option<NodeId>, value_node: Option<NodeId>) -> Self {
        Self {
            value: Some(value),
            key_node,
            value_node,
            reference: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            value: None,
            key_node: None,
            value_node: None,
            reference: None,
        }
    }

    /// Empty iff the value and both node links are absent.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.key_node.is_none() && self.value_node.is_none()
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn with_reference(mut self, descriptor: ReferenceDescriptor) -> Self {
        self.reference = Some(descriptor);
        self
    }
}

impl<T> Default for ValueRef<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialEq> PartialEq for ValueRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for ValueRef<T> {}

/// A map key's text plus the node it came from
///
/// Ordering, equality, and hashing consider the text only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRef {
    pub text: String,
    pub node: Option<NodeId>,
}

impl KeyRef {
    pub fn new(text: impl Into<String>, node: Option<NodeId>) -> Self {
        Self {
            text: text.into(),
            node,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<&str> for KeyRef {
    fn from(text: &str) -> Self {
        Self::new(text, None)
    }
}

impl PartialEq for KeyRef {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for KeyRef {}

impl Hash for KeyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl Borrow<str> for KeyRef {
    fn borrow(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ref_empty() {
        let vref: ValueRef<String> = ValueRef::empty();
        assert!(vref.is_empty());

        let full = ValueRef::new("x".to_string(), None, None);
        assert!(!full.is_empty());
    }

    #[test]
    fn test_equality_ignores_nodes() {
        let a = ValueRef::new(7i64, Some(NodeId::default()), None);
        let b = ValueRef::new(7i64, None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ref_text_identity() {
        let a = KeyRef::new("name", None);
        let b = KeyRef::from("name");
        assert_eq!(a, b);
    }
}
