//! Arena-backed parse tree
//!
//! Documents are held as an immutable arena of node records indexed by
//! [`NodeId`]. Pointers between nodes are arena indices, so reference loops in
//! the document never create ownership loops in memory. Mapping children are
//! stored interleaved (key, value, key, value, ...); a malformed mapping with
//! an odd child count is tolerated by ignoring the trailing unmatched key.
//!
//! Trees are built once (via [`TreeBuilder`] or the ingestion adapters) and
//! are read-only afterwards, which makes them safe to share across worker
//! threads without locking.

use serde::{Deserialize, Serialize};

use super::span::Span;

/// Index of a node in the parse tree arena
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node kinds in a parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Scalar,
    Mapping,
    Sequence,
    Alias,
    Document,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    text: String,
    children: Vec<NodeId>,
    span: Span,
    alias_target: Option<NodeId>,
}

/// Immutable document tree
#[derive(Debug, Clone, Default)]
pub struct ParseTree {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
}

impl ParseTree {
    /// The document node. Empty trees answer with an empty document scalar.
    pub fn root(&self) -> NodeId {
        self.root.unwrap_or(NodeId(0))
    }

    /// The content node under the document root, aliases dereferenced.
    pub fn root_content(&self) -> NodeId {
        let root = self.root();
        match self.children(root).first() {
            Some(&child) => self.deref(child),
            None => root,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    /// Scalar text of a node. Empty for non-scalars.
    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].text
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn alias_target(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].alias_target
    }

    /// Follow alias links through to the anchored node.
    ///
    /// Aliases are dereferenced, never duplicated: every use of an anchor
    /// lands on the same arena index, so two aliases of one anchor extract
    /// and hash identically. The walk is bounded by the arena size to stay
    /// finite on malformed alias loops.
    pub fn deref(&self, id: NodeId) -> NodeId {
        let mut current = id;
        for _ in 0..self.nodes.len() {
            match self.nodes[current.index()].alias_target {
                Some(target) if self.nodes[current.index()].kind == NodeKind::Alias => {
                    current = target;
                }
                _ => return current,
            }
        }
        current
    }

    /// Key/value pairs of a mapping node in document order.
    ///
    /// The trailing key of an odd-length mapping is dropped.
    pub fn mapping_pairs(&self, id: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let node = self.deref(id);
        let children = if self.kind(node) == NodeKind::Mapping {
            self.children(node)
        } else {
            &[]
        };
        children.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Locate a mapping entry by key label.
    ///
    /// Exact match wins; a case-insensitive pass runs only when no exact key
    /// matched. Returns (key node, value node).
    pub fn find_key(&self, mapping: NodeId, label: &str) -> Option<(NodeId, NodeId)> {
        let mut fallback = None;
        for (key, value) in self.mapping_pairs(mapping) {
            let text = self.text(self.deref(key));
            if text == label {
                return Some((key, value));
            }
            if fallback.is_none() && text.eq_ignore_ascii_case(label) {
                fallback = Some((key, value));
            }
        }
        fallback
    }

    /// Build a parse tree from an already-decoded JSON value.
    ///
    /// JSON carries no positions, so spans are zero. Object key order is
    /// preserved as document order.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut builder = TreeBuilder::new();
        let content = add_json(&mut builder, value);
        builder.finish(content)
    }

    /// Build a parse tree from an already-decoded YAML value.
    ///
    /// Anchors are expanded by the YAML decoder before we see them; alias
    /// nodes only appear in trees assembled through [`TreeBuilder`].
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        let mut builder = TreeBuilder::new();
        let content = add_yaml(&mut builder, value);
        builder.finish(content)
    }
}

fn add_json(builder: &mut TreeBuilder, value: &serde_json::Value) -> NodeId {
    use serde_json::Value;
    match value {
        Value::Null => builder.scalar("null", Span::zero()),
        Value::Bool(b) => builder.scalar(if *b { "true" } else { "false" }, Span::zero()),
        Value::Number(n) => builder.scalar(&n.to_string(), Span::zero()),
        Value::String(s) => builder.scalar(s, Span::zero()),
        Value::Array(items) => {
            let children: Vec<NodeId> = items.iter().map(|v| add_json(builder, v)).collect();
            builder.sequence(children, Span::zero())
        }
        Value::Object(map) => {
            let mut children = Vec::with_capacity(map.len() * 2);
            for (key, val) in map {
                children.push(builder.scalar(key, Span::zero()));
                children.push(add_json(builder, val));
            }
            builder.mapping(children, Span::zero())
        }
    }
}

fn add_yaml(builder: &mut TreeBuilder, value: &serde_yaml::Value) -> NodeId {
    use serde_yaml::Value;
    match value {
        Value::Null => builder.scalar("null", Span::zero()),
        Value::Bool(b) => builder.scalar(if *b { "true" } else { "false" }, Span::zero()),
        Value::Number(n) => builder.scalar(&n.to_string(), Span::zero()),
        Value::String(s) => builder.scalar(s, Span::zero()),
        Value::Sequence(items) => {
            let children: Vec<NodeId> = items.iter().map(|v| add_yaml(builder, v)).collect();
            builder.sequence(children, Span::zero())
        }
        Value::Mapping(map) => {
            let mut children = Vec::with_capacity(map.len() * 2);
            for (key, val) in map {
                let key_text = yaml_key_text(key);
                children.push(builder.scalar(&key_text, Span::zero()));
                children.push(add_yaml(builder, val));
            }
            builder.mapping(children, Span::zero())
        }
        Value::Tagged(tagged) => add_yaml(builder, &tagged.value),
    }
}

fn yaml_key_text(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value;
    match key {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Incremental arena construction for [`ParseTree`]
///
/// Nodes may be created in any order; `finish` wraps the given content node
/// in a document node and freezes the tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    pub fn scalar(&mut self, text: &str, span: Span) -> NodeId {
        self.push(NodeData {
            kind: NodeKind::Scalar,
            text: text.to_string(),
            children: Vec::new(),
            span,
            alias_target: None,
        })
    }

    /// Mapping from interleaved (key, value, key, value, ...) children.
    pub fn mapping(&mut self, children: Vec<NodeId>, span: Span) -> NodeId {
        self.push(NodeData {
            kind: NodeKind::Mapping,
            text: String::new(),
            children,
            span,
            alias_target: None,
        })
    }

    pub fn sequence(&mut self, children: Vec<NodeId>, span: Span) -> NodeId {
        self.push(NodeData {
            kind: NodeKind::Sequence,
            text: String::new(),
            children,
            span,
            alias_target: None,
        })
    }

    /// Alias node pointing at an anchored target elsewhere in the arena.
    pub fn alias(&mut self, target: NodeId, span: Span) -> NodeId {
        self.push(NodeData {
            kind: NodeKind::Alias,
            text: String::new(),
            children: Vec::new(),
            span,
            alias_target: Some(target),
        })
    }

    /// Convenience: mapping with a single scalar key/value pair.
    pub fn pair(&mut self, key: &str, value: NodeId, span: Span) -> NodeId {
        let key_node = self.scalar(key, span);
        self.mapping(vec![key_node, value], span)
    }

    pub fn finish(mut self, content: NodeId) -> ParseTree {
        let root = self.push(NodeData {
            kind: NodeKind::Document,
            text: String::new(),
            children: vec![content],
            span: Span::zero(),
            alias_target: None,
        });
        ParseTree {
            nodes: self.nodes,
            root: Some(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mapping_pairs_skip_trailing_key() {
        let mut b = TreeBuilder::new();
        let k1 = b.scalar("a", Span::zero());
        let v1 = b.scalar("1", Span::zero());
        let dangling = b.scalar("b", Span::zero());
        let map = b.mapping(vec![k1, v1, dangling], Span::zero());
        let tree = b.finish(map);

        let pairs: Vec<_> = tree.mapping_pairs(map).collect();
        assert_eq!(pairs, vec![(k1, v1)]);
    }

    #[test]
    fn test_find_key_prefers_exact_over_case_insensitive() {
        let mut b = TreeBuilder::new();
        let k1 = b.scalar("Name", Span::zero());
        let v1 = b.scalar("upper", Span::zero());
        let k2 = b.scalar("name", Span::zero());
        let v2 = b.scalar("lower", Span::zero());
        let map = b.mapping(vec![k1, v1, k2, v2], Span::zero());
        let tree = b.finish(map);

        let (_, value) = tree.find_key(map, "name").unwrap();
        assert_eq!(tree.text(value), "lower");

        let (_, fallback) = tree.find_key(map, "NAME").unwrap();
        assert_eq!(tree.text(fallback), "upper");
    }

    #[test]
    fn test_alias_deref_lands_on_anchor() {
        let mut b = TreeBuilder::new();
        let anchor = b.scalar("shared", Span::zero());
        let alias = b.alias(anchor, Span::zero());
        let seq = b.sequence(vec![anchor, alias], Span::zero());
        let tree = b.finish(seq);

        assert_eq!(tree.deref(alias), anchor);
        assert_eq!(tree.deref(anchor), anchor);
    }

    #[test]
    fn test_from_json_preserves_key_order() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let tree = ParseTree::from_json(&value);
        let root = tree.root_content();

        let keys: Vec<_> = tree
            .mapping_pairs(root)
            .map(|(k, _)| tree.text(k).to_string())
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_from_yaml_scalars() {
        let value: serde_yaml::Value = serde_yaml::from_str("count: 3\nok: true\n").unwrap();
        let tree = ParseTree::from_yaml(&value);
        let root = tree.root_content();

        let (_, count) = tree.find_key(root, "count").unwrap();
        assert_eq!(tree.text(count), "3");
        let (_, ok) = tree.find_key(root, "ok").unwrap();
        assert_eq!(tree.text(ok), "true");
    }
}
