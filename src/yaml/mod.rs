//! YAML syntax tree — one arena per sub-document.
//!
//! Nodes are addressed by `NodeId`; parents are stored as ids so ancestor
//! walks stay O(1) per step without reference cycles. All offsets are
//! absolute byte offsets into the text of the whole stream.

pub mod parser;

use std::fmt;

use serde_json::Value;

pub use parser::parse;

/// Index of a node inside its `Document` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object { properties: Vec<NodeId> },
    Array { items: Vec<NodeId> },
    Property { key: NodeId, value: Option<NodeId> },
    String { value: String, is_key: bool },
    Number(serde_json::Number),
    Boolean(bool),
    Null,
}

/// Type tag of a node, as named by JSON Schema (`property` aside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
    Property,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Object => "object",
            NodeType::Array => "array",
            NodeType::Property => "property",
            NodeType::String => "string",
            NodeType::Number => "number",
            NodeType::Boolean => "boolean",
            NodeType::Null => "null",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub start: usize,
    pub end: usize,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Object { .. } => NodeType::Object,
            NodeKind::Array { .. } => NodeType::Array,
            NodeKind::Property { .. } => NodeType::Property,
            NodeKind::String { .. } => NodeType::String,
            NodeKind::Number(_) => NodeType::Number,
            NodeKind::Boolean(_) => NodeType::Boolean,
            NodeKind::Null => NodeType::Null,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self.kind, NodeKind::String { is_key: true, .. })
    }

    fn contains(&self, offset: usize, include_end: bool) -> bool {
        offset >= self.start && (offset < self.end || (include_end && offset == self.end))
    }
}

/// One step of a node path from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A syntax problem found while parsing; the tree is still usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub start: usize,
    pub end: usize,
}

/// One parsed sub-document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    errors: Vec<SyntaxError>,
}

impl Document {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Children in source order. A property yields its key, then its value.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).kind {
            NodeKind::Object { properties } => properties.clone(),
            NodeKind::Array { items } => items.clone(),
            NodeKind::Property { key, value } => {
                let mut children = vec![*key];
                children.extend(*value);
                children
            }
            _ => Vec::new(),
        }
    }

    /// The key node and optional value node of a property.
    pub fn property(&self, id: NodeId) -> Option<(NodeId, Option<NodeId>)> {
        match self.node(id).kind {
            NodeKind::Property { key, value } => Some((key, value)),
            _ => None,
        }
    }

    /// Literal text of a string node (keys included).
    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::String { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Key text of a property node.
    pub fn key_of(&self, property: NodeId) -> Option<&str> {
        let (key, _) = self.property(property)?;
        self.string_value(key)
    }

    /// Deepest node whose half-open range contains `offset`.
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        self.find_node(offset, false)
    }

    /// Like `node_at`, but a node also covers the offset at its end.
    pub fn node_at_inclusive(&self, offset: usize) -> Option<NodeId> {
        self.find_node(offset, true)
    }

    fn find_node(&self, offset: usize, include_end: bool) -> Option<NodeId> {
        let mut current = self.root?;
        if !self.node(current).contains(offset, include_end) {
            return None;
        }
        'descend: loop {
            for child in self.children(current) {
                let node = self.node(child);
                if node.start > offset {
                    break;
                }
                if node.contains(offset, include_end) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Keys and indices leading from the root to `id`.
    pub fn path_of(&self, id: NodeId) -> Vec<PathSegment> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            match &self.node(parent).kind {
                NodeKind::Property { key, value } if *value == Some(current) => {
                    if let Some(key) = self.string_value(*key) {
                        path.push(PathSegment::Key(key.to_string()));
                    }
                }
                NodeKind::Array { items } => {
                    if let Some(index) = items.iter().position(|item| *item == current) {
                        path.push(PathSegment::Index(index));
                    }
                }
                _ => {}
            }
            current = parent;
        }
        path.reverse();
        path
    }

    /// Decoded JSON value of a node. Duplicate keys keep the last value.
    pub fn value_of(&self, id: NodeId) -> Value {
        match &self.node(id).kind {
            NodeKind::Object { properties } => {
                let mut map = serde_json::Map::new();
                for property in properties {
                    if let Some((key, value)) = self.property(*property) {
                        let key = self.string_value(key).unwrap_or_default().to_string();
                        let value = value.map(|v| self.value_of(v)).unwrap_or(Value::Null);
                        map.insert(key, value);
                    }
                }
                Value::Object(map)
            }
            NodeKind::Array { items } => {
                Value::Array(items.iter().map(|item| self.value_of(*item)).collect())
            }
            NodeKind::Property { value, .. } => {
                value.map(|v| self.value_of(v)).unwrap_or(Value::Null)
            }
            NodeKind::String { value, .. } => Value::String(value.clone()),
            NodeKind::Number(number) => Value::Number(number.clone()),
            NodeKind::Boolean(b) => Value::Bool(*b),
            NodeKind::Null => Value::Null,
        }
    }

    // ── Construction (parser only) ──

    pub(crate) fn alloc(&mut self, kind: NodeKind, start: usize, end: usize, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            start,
            end,
            parent,
        });
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub(crate) fn push_error(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.errors.push(SyntaxError {
            message: message.into(),
            start,
            end,
        });
    }
}

/// All sub-documents of one text buffer, in source order.
#[derive(Debug, Clone, Default)]
pub struct DocumentStream {
    documents: Vec<Document>,
}

impl DocumentStream {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The sub-document whose root covers `offset` (both ends inclusive).
    pub fn document_at(&self, offset: usize) -> Option<&Document> {
        self.documents.iter().find(|doc| {
            doc.root()
                .map(|root| {
                    let node = doc.node(root);
                    node.start <= offset && offset <= node.end
                })
                .unwrap_or(false)
        })
    }
}
