use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /v1/files/:key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// A node of type `DOCUMENT`.
    pub document: Node,
    /// Component metadata keyed by node id. Not interpreted.
    #[serde(default)]
    pub components: Map<String, Value>,
    #[serde(default)]
    pub schema_version: i64,
}

/// A single element of the document tree as delivered by the API.
///
/// At the root of every file is a `DOCUMENT` node whose children are
/// `CANVAS` nodes, one per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Every other property of the node, untouched.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

fn visible_by_default() -> bool {
    true
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            node_type,
            visible: true,
            children: Vec::new(),
            properties: Map::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }
}

/// Kind of a node. Different kinds carry different properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Document,
    Canvas,
    Frame,
    Group,
    Vector,
    #[serde(rename = "BOOLEAN", alias = "BOOLEAN_OPERATION")]
    Boolean,
    Star,
    Line,
    Ellipse,
    RegularPolygon,
    Rectangle,
    Text,
    Slice,
    Component,
    Instance,
    #[serde(other)]
    Unknown,
}

impl NodeType {
    pub const ALL: [NodeType; 15] = [
        NodeType::Document,
        NodeType::Canvas,
        NodeType::Frame,
        NodeType::Group,
        NodeType::Vector,
        NodeType::Boolean,
        NodeType::Star,
        NodeType::Line,
        NodeType::Ellipse,
        NodeType::RegularPolygon,
        NodeType::Rectangle,
        NodeType::Text,
        NodeType::Slice,
        NodeType::Component,
        NodeType::Instance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Document => "DOCUMENT",
            NodeType::Canvas => "CANVAS",
            NodeType::Frame => "FRAME",
            NodeType::Group => "GROUP",
            NodeType::Vector => "VECTOR",
            NodeType::Boolean => "BOOLEAN",
            NodeType::Star => "STAR",
            NodeType::Line => "LINE",
            NodeType::Ellipse => "ELLIPSE",
            NodeType::RegularPolygon => "REGULAR_POLYGON",
            NodeType::Rectangle => "RECTANGLE",
            NodeType::Text => "TEXT",
            NodeType::Slice => "SLICE",
            NodeType::Component => "COMPONENT",
            NodeType::Instance => "INSTANCE",
            NodeType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeType(pub String);

impl fmt::Display for UnknownNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node type `{}`", self.0)
    }
}

impl std::error::Error for UnknownNodeType {}

/// Accepts the wire spelling as well as lowercase and kebab-case variants
/// (`frame`, `regular-polygon`, `BOOLEAN_OPERATION`).
impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        if normalized == "BOOLEAN_OPERATION" {
            return Ok(NodeType::Boolean);
        }
        NodeType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}
