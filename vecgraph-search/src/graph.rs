//! Graph data model: typed nodes, typed directed relationships, and result rows.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property bag attached to nodes and relationships.
pub type Properties = serde_json::Map<String, Value>;

/// Property of a `Document` node holding the document identifier shared with
/// the vector index.
pub const DOCUMENT_ID_PROPERTY: &str = "doc_id";

/// Property of a `Document` node holding the document text.
pub const CONTENT_PROPERTY: &str = "content";

/// Node labels known to the hybrid search graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    User,
    Query,
    Document,
    Topic,
    Intent,
}

impl NodeLabel {
    /// The label as written in Cypher.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::User => "User",
            NodeLabel::Query => "Query",
            NodeLabel::Document => "Document",
            NodeLabel::Topic => "Topic",
            NodeLabel::Intent => "Intent",
        }
    }

    /// Parse a Cypher label.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "User" => Some(NodeLabel::User),
            "Query" => Some(NodeLabel::Query),
            "Document" => Some(NodeLabel::Document),
            "Topic" => Some(NodeLabel::Topic),
            "Intent" => Some(NodeLabel::Intent),
            _ => None,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types. Every type has a fixed direction, e.g.
/// `(User)-[:SEARCHED]->(Query)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// `User -> Query`
    Searched,
    /// `Query -> Intent`
    HasIntent,
    /// `Query -> Topic` or `Document -> Topic`
    About,
    /// `Document -> Topic`
    Covers,
    /// `Document -> Topic`, a weaker form of `COVERS`.
    References,
    /// `Query -> Document`
    Returned,
    /// `User -> Document`
    Viewed,
    /// `User -> Document`
    Bookmarked,
}

impl RelationType {
    /// The relationship type as written in Cypher.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Searched => "SEARCHED",
            RelationType::HasIntent => "HAS_INTENT",
            RelationType::About => "ABOUT",
            RelationType::Covers => "COVERS",
            RelationType::References => "REFERENCES",
            RelationType::Returned => "RETURNED",
            RelationType::Viewed => "VIEWED",
            RelationType::Bookmarked => "BOOKMARKED",
        }
    }

    /// Parse a Cypher relationship type.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "SEARCHED" => Some(RelationType::Searched),
            "HAS_INTENT" => Some(RelationType::HasIntent),
            "ABOUT" => Some(RelationType::About),
            "COVERS" => Some(RelationType::Covers),
            "REFERENCES" => Some(RelationType::References),
            "RETURNED" => Some(RelationType::Returned),
            "VIEWED" => Some(RelationType::Viewed),
            "BOOKMARKED" => Some(RelationType::Bookmarked),
            _ => None,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the graph store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Store-assigned unique identifier (a UUID).
    pub id: String,
    pub label: NodeLabel,
    pub name: String,
    pub properties: Properties,
}

impl Node {
    /// Create a node with a fresh UUID.
    pub fn new(label: NodeLabel, name: impl Into<String>, properties: Properties) -> Self {
        Self { id: uuid::Uuid::new_v4().to_string(), label, name: name.into(), properties }
    }

    /// Look up a property. `name` and `uuid` resolve to the node's own fields
    /// so pattern projections can use them like any stored property.
    pub fn property(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(Value::String(self.name.clone())),
            "uuid" => Some(Value::String(self.id.clone())),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// The document identifier of a `Document` node.
    pub fn document_id(&self) -> Option<&str> {
        self.properties.get(DOCUMENT_ID_PROPERTY).and_then(Value::as_str)
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub kind: RelationType,
    /// Id of the start node.
    pub from: String,
    /// Id of the end node.
    pub to: String,
    pub properties: Properties,
}

impl Relationship {
    /// Create a relationship with a fresh UUID.
    pub fn new(from: &Node, kind: RelationType, to: &Node, properties: Properties) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            from: from.id.clone(),
            to: to.id.clone(),
            properties,
        }
    }
}

/// A value bound to a variable in a result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GraphValue {
    Node(Node),
    Relationship(Relationship),
    Scalar(Value),
    List(Vec<GraphValue>),
}

impl GraphValue {
    /// Borrow the string inside a scalar value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Flatten a list of scalars into strings, skipping nulls.
    ///
    /// Non-string scalars (numbers, booleans) are rendered with their JSON
    /// representation so numeric document ids survive.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            GraphValue::List(items) => items.iter().filter_map(GraphValue::scalar_string).collect(),
            other => other.scalar_string().into_iter().collect(),
        }
    }

    fn scalar_string(&self) -> Option<String> {
        match self {
            GraphValue::Scalar(Value::Null) => None,
            GraphValue::Scalar(Value::String(s)) => Some(s.clone()),
            GraphValue::Scalar(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl From<Value> for GraphValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => GraphValue::List(items.into_iter().map(Into::into).collect()),
            other => GraphValue::Scalar(other),
        }
    }
}

/// One result row: declared variable name → bound value.
pub type Row = HashMap<String, GraphValue>;
