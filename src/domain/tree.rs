//! The document tree.
//!
//! Nodes live in an arena owned by [`Document`]; parents refer to children
//! (and children back to parents) by arena slot. Both construction from the
//! decoded payload and traversal use an explicit work list, so arbitrarily
//! deep trees never exhaust the native stack.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use figport_api_types as wire;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DocumentError;

pub use figport_api_types::NodeType;

/// Identifier of a node, unique within its document (e.g. `1:23`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One element of a loaded document.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    kind: NodeType,
    visible: bool,
    displayed: bool,
    depth: usize,
    slot: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    style: Map<String, Value>,
}

impl Node {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    /// The node's own visibility flag.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Visible and not hidden by any ancestor.
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Distance from the root; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Style properties as delivered by the API, uninterpreted.
    pub fn style(&self) -> &Map<String, Value> {
        &self.style
    }
}

/// A loaded design document. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    version: Option<String>,
    last_modified: Option<String>,
    schema_version: i64,
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl Document {
    /// Build a document from the decoded `GET /v1/files/:key` payload.
    pub fn from_file(file: wire::File) -> Result<Self, DocumentError> {
        let mut document = Self::from_root(file.document, file.schema_version)?;
        document.name = file.name;
        document.version = file.version;
        document.last_modified = file.last_modified;
        Ok(document)
    }

    /// Build a document from a bare root node.
    ///
    /// The payload tree is taken apart while it is copied into the arena, so
    /// neither construction nor dropping the payload recurses.
    pub fn from_root(root: wire::Node, schema_version: i64) -> Result<Self, DocumentError> {
        if root.node_type != NodeType::Document {
            let found = root.node_type;
            dismantle(vec![root], Vec::new());
            return Err(DocumentError::RootNotDocument { found });
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut index = HashMap::new();
        let mut pending: Vec<(wire::Node, Option<usize>)> = vec![(root, None)];

        while let Some((mut raw, parent)) = pending.pop() {
            let slot = nodes.len();
            let children = std::mem::take(&mut raw.children);

            if raw.id.is_empty() {
                let parent_id = parent
                    .map(|p| nodes[p].id.to_string())
                    .unwrap_or_default();
                dismantle(children, pending);
                return Err(DocumentError::empty_identifier(parent_id));
            }

            let id = NodeId::new(raw.id);
            if index.insert(id.clone(), slot).is_some() {
                dismantle(children, pending);
                return Err(DocumentError::duplicate(id.0));
            }

            let (depth, parent_displayed) = match parent {
                Some(p) => (nodes[p].depth + 1, nodes[p].displayed),
                None => (0, true),
            };

            nodes.push(Node {
                id,
                name: raw.name,
                kind: raw.node_type,
                visible: raw.visible,
                displayed: raw.visible && parent_displayed,
                depth,
                slot,
                parent,
                children: Vec::with_capacity(children.len()),
                style: raw.properties,
            });
            if let Some(p) = parent {
                nodes[p].children.push(slot);
            }

            pending.extend(children.into_iter().rev().map(|child| (child, Some(slot))));
        }

        Ok(Self {
            name: String::new(),
            version: None,
            last_modified: None,
            schema_version,
            nodes,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a document has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|slot| &self.nodes[*slot])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn parent(&self, node: &Node) -> Option<&Node> {
        node.parent.map(|slot| &self.nodes[slot])
    }

    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().map(|slot| &self.nodes[*slot])
    }

    /// Lazy depth-first pre-order walk over the whole document.
    pub fn traverse(&self) -> PreOrder<'_> {
        PreOrder::new(self, 0)
    }

    /// Lazy pre-order walk over `node` and its descendants.
    pub fn subtree<'a>(&'a self, node: &Node) -> PreOrder<'a> {
        PreOrder::new(self, node.slot)
    }

    /// Every node in depth-first pre-order, root first.
    pub fn flatten(&self) -> Vec<&Node> {
        self.traverse().collect()
    }
}

/// Pre-order iterator driven by an explicit stack of arena slots.
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
    document: &'a Document,
    stack: Vec<usize>,
}

impl<'a> PreOrder<'a> {
    fn new(document: &'a Document, start: usize) -> Self {
        Self {
            document,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.stack.pop()?;
        let node = &self.document.nodes[slot];
        self.stack.extend(node.children.iter().rev().copied());
        Some(node)
    }
}

/// Drop rejected payload subtrees without recursing.
fn dismantle(children: Vec<wire::Node>, pending: Vec<(wire::Node, Option<usize>)>) {
    let mut stack = children;
    stack.extend(pending.into_iter().map(|(node, _)| node));
    while let Some(mut node) = stack.pop() {
        stack.append(&mut node.children);
    }
}
