//! Graph records written to and read from a graph store.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Property name holding a node's vector.
pub const EMBEDDING_PROPERTY: &str = "embedding";

/// Generic label given to every node that carries a vector.
pub const ENTITY_LABEL: &str = "Entity";

/// A scalar property value.
///
/// Graph databases only store scalars (and lists of them) on records, so
/// nested JSON is never accepted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Ordered property map; ordering keeps generated queries stable.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A labeled entity identified by a free-text id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Free-text identifier (e.g. "Steve Jobs").
    pub id: String,
    /// Primary label (e.g. "Person").
    #[serde(rename = "type")]
    pub node_type: String,
    /// Additional labels (e.g. "Entity").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Scalar properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    /// Vector stored under [`EMBEDDING_PROPERTY`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Node {
    /// Create a new node.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            labels: Vec::new(),
            properties: Properties::new(),
            embedding: None,
        }
    }

    /// Add an extra label (ignored if already present).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.add_label(label);
        self
    }

    /// Add an extra label in place.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if label != self.node_type && !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attach a vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Primary label followed by the extra labels.
    pub fn all_labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.node_type.as_str()).chain(self.labels.iter().map(String::as_str))
    }

    /// Whether the node carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.all_labels().any(|l| l == label)
    }
}

/// A directed, typed edge between two nodes, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship type (e.g. "FOUNDED").
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// Scalar properties (e.g. `time`, `rating`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type: relationship_type.into(),
            properties: Properties::new(),
        }
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Render as a triple line.
    pub fn triple(&self) -> GraphTriple {
        GraphTriple::new(&self.source, &self.relationship_type, &self.target)
    }
}

/// Nodes and relationships extracted from one source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    /// Text (or a short description of it) the graph was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl GraphDocument {
    pub fn new(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Self {
        Self {
            nodes,
            relationships,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// One `source --[TYPE]--> target` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphTriple {
    pub source: String,
    pub relationship: String,
    pub target: String,
}

impl GraphTriple {
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for GraphTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --[{}]--> {}", self.source, self.relationship, self.target)
    }
}

/// Counts reported by a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub relationships: usize,
    /// Nodes carrying a vector under [`EMBEDDING_PROPERTY`].
    pub embedded_nodes: usize,
    /// Node count per primary label.
    pub nodes_by_label: BTreeMap<String, usize>,
    /// Relationship count per type.
    pub relationships_by_type: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_labels() {
        let node = Node::new("Apple", "Organization")
            .with_label(ENTITY_LABEL)
            .with_label(ENTITY_LABEL)
            .with_label("Organization");

        assert_eq!(node.labels, vec![ENTITY_LABEL.to_string()]);
        assert!(node.has_label("Organization"));
        assert!(node.has_label(ENTITY_LABEL));
        assert!(!node.has_label("Person"));
    }

    #[test]
    fn test_node_serde_uses_type_key() {
        let node: Node = serde_json::from_str(r#"{"id": "Apple", "type": "Organization"}"#).unwrap();
        assert_eq!(node.node_type, "Organization");
        assert!(node.embedding.is_none());

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({"id": "Apple", "type": "Organization"}));
    }

    #[test]
    fn test_property_values_untagged() {
        let rel: Relationship = serde_json::from_str(
            r#"{"source": "A", "target": "B", "type": "RATED", "properties": {"rating": 2.5, "time": "13:45", "count": 3}}"#,
        )
        .unwrap();

        assert_eq!(rel.properties["rating"], PropertyValue::Float(2.5));
        assert_eq!(rel.properties["time"], PropertyValue::String("13:45".into()));
        assert_eq!(rel.properties["count"], PropertyValue::Integer(3));
    }

    #[test]
    fn test_triple_display() {
        let rel = Relationship::new("Steve Jobs", "Apple", "FOUNDED");
        assert_eq!(rel.triple().to_string(), "Steve Jobs --[FOUNDED]--> Apple");
    }
}
