//! Graph store trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::KgResult;
use crate::types::{GraphDocument, GraphStats, GraphTriple, Properties, ScoredNode, EMBEDDING_PROPERTY, ENTITY_LABEL};

/// Similarity function of a vector index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SimilarityFunction {
    #[default]
    Cosine,
    Euclidean,
}

/// Vector index definition: which label/property it covers and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Index name.
    #[serde(default = "default_index_name")]
    pub name: String,
    /// Node label the index covers.
    #[serde(default = "default_index_label")]
    pub label: String,
    /// Node property holding the vector.
    #[serde(default = "default_index_property")]
    pub property: String,
    /// Vector dimensionality; must equal the embedder's output length.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Similarity function.
    #[serde(default)]
    pub similarity: SimilarityFunction,
}

fn default_index_name() -> String {
    "entity_index".to_string()
}

fn default_index_label() -> String {
    ENTITY_LABEL.to_string()
}

fn default_index_property() -> String {
    EMBEDDING_PROPERTY.to_string()
}

fn default_dimensions() -> usize {
    768
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            label: default_index_label(),
            property: default_index_property(),
            dimensions: default_dimensions(),
            similarity: SimilarityFunction::Cosine,
        }
    }
}

impl VectorIndexConfig {
    /// Same index with a different dimensionality.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// A node lacking a vector, with the text to embed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNode {
    pub id: String,
    pub text: String,
}

/// Core GraphStore trait - all graph store backends implement this.
///
/// Every write is idempotent: nodes are merged by id, relationships by
/// (source, type, target), and schema objects are created if absent.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Check that the store is reachable with the configured credentials.
    async fn verify_connectivity(&self) -> KgResult<()>;

    /// Delete all nodes and relationships.
    async fn delete_all(&self) -> KgResult<()>;

    /// Create the vector index unless one with the same name exists.
    async fn create_vector_index(&self, index: &VectorIndexConfig) -> KgResult<()>;

    /// Drop an index by name; dropping a missing index is not an error.
    async fn drop_index(&self, name: &str) -> KgResult<()>;

    /// Dimensionality of an existing vector index, `None` if absent.
    async fn vector_index_dimensions(&self, name: &str) -> KgResult<Option<usize>>;

    /// Create a uniqueness constraint on `label.property`.
    async fn create_unique_constraint(&self, label: &str, property: &str) -> KgResult<()>;

    /// Merge the document's nodes and relationships into the store.
    ///
    /// Relationships whose endpoints do not exist are skipped; the returned
    /// value is the number of relationships written.
    async fn add_graph_document(&self, document: &GraphDocument) -> KgResult<usize>;

    /// Set a vector property on the node with the given id.
    async fn set_vector(&self, node_id: &str, property: &str, vector: &[f32]) -> KgResult<()>;

    /// Add `label` to every node that has `property` set; returns the count.
    async fn label_nodes_with_property(&self, label: &str, property: &str) -> KgResult<usize>;

    /// Nodes with `label` that lack `vector_property`, paired with the value
    /// of `text_property` (falling back to the id).
    async fn nodes_missing_vector(
        &self,
        label: &str,
        vector_property: &str,
        text_property: &str,
    ) -> KgResult<Vec<PendingNode>>;

    /// Top-`k` nodes of an index by similarity to `vector`.
    async fn vector_search(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
        return_properties: &[String],
    ) -> KgResult<Vec<ScoredNode>>;

    /// Relationships touching the node with the given id, in either direction.
    async fn neighborhood(&self, node_id: &str, limit: usize) -> KgResult<Vec<GraphTriple>>;

    /// Node/relationship counts.
    async fn stats(&self) -> KgResult<GraphStats>;

    /// Run a read-only Cypher query and return its rows as column maps.
    ///
    /// Nulls are left out; lists, nodes and maps come back as JSON text.
    async fn read_query(&self, cypher: &str) -> KgResult<Vec<Properties>>;
}

/// Graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: GraphStoreProvider,
    /// Connection URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

fn default_url() -> String {
    "bolt://localhost:7687".to_string()
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            provider: GraphStoreProvider::Neo4j,
            url: default_url(),
            username: None,
            password: None,
            database: None,
        }
    }
}

/// Graph store provider type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GraphStoreProvider {
    #[default]
    Neo4j,
    /// In-process store, nothing persists past the process.
    Memory,
}
