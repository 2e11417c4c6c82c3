//! Neo4j graph store implementation over Bolt.

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{query, BoltMap, BoltString, BoltType, ConfigBuilder, Graph, Query};
use tracing::{debug, info};

use kgrag_core::error::{ErrorCode, KgError, KgResult};
use kgrag_core::retrieval::ensure_read_only;
use kgrag_core::traits::{GraphStore, GraphStoreConfig, PendingNode, VectorIndexConfig};
use kgrag_core::types::{
    GraphDocument, GraphStats, GraphTriple, Node, Properties, PropertyValue, ScoredNode,
    EMBEDDING_PROPERTY, ENTITY_LABEL,
};

use crate::cypher;

/// Neo4j graph store implementation.
pub struct Neo4jGraphStore {
    graph: Graph,
    config: GraphStoreConfig,
}

fn map_error(context: &str, e: neo4rs::Error) -> KgError {
    match e {
        neo4rs::Error::AuthenticationError(message) => KgError::Authentication {
            message: format!("{}: {}", context, message),
            code: ErrorCode::AuthInvalidKey,
            source: None,
        },
        neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
            KgError::database_unreachable(format!("{}: {}", context, e))
        }
        _ => KgError::graph_store(format!("{}: {}", context, e)),
    }
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Boolean(b) => BoltType::from(*b),
        PropertyValue::Integer(i) => BoltType::from(*i),
        PropertyValue::Float(f) => BoltType::from(*f),
        PropertyValue::String(s) => BoltType::from(s.clone()),
    }
}

fn properties_to_bolt(properties: &Properties) -> BoltType {
    let mut map = BoltMap::new();
    for (key, value) in properties {
        map.put(BoltString::from(key.as_str()), to_bolt(value));
    }
    BoltType::Map(map)
}

/// Scalars map over directly; structured values are kept as JSON text.
fn from_json(value: serde_json::Value) -> Option<PropertyValue> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(PropertyValue::Boolean(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(PropertyValue::Integer(i)),
            None => n.as_f64().map(PropertyValue::Float),
        },
        serde_json::Value::String(s) => Some(PropertyValue::String(s)),
        other => Some(PropertyValue::String(other.to_string())),
    }
}

fn vector_to_f64(vector: &[f32]) -> Vec<f64> {
    vector.iter().map(|&v| v as f64).collect()
}

impl Neo4jGraphStore {
    /// Connect to Neo4j.
    ///
    /// Credentials fall back to `neo4j` with an empty password.
    pub async fn new(config: GraphStoreConfig) -> KgResult<Self> {
        let username = config.username.clone().unwrap_or_else(|| "neo4j".to_string());
        let password = config.password.clone().unwrap_or_default();

        let mut builder = ConfigBuilder::default()
            .uri(config.url.as_str())
            .user(username.as_str())
            .password(password.as_str());
        if let Some(ref database) = config.database {
            builder = builder.db(database.as_str());
        }
        let bolt_config = builder
            .build()
            .map_err(|e| KgError::Configuration(format!("Invalid Neo4j config: {}", e)))?;

        let graph = Graph::connect(bolt_config)
            .await
            .map_err(|e| map_error("Failed to connect to Neo4j", e))?;

        info!(url = %config.url, "Connected to Neo4j");
        Ok(Self { graph, config })
    }

    /// URL this store is connected to.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn run(&self, q: Query, context: &str) -> KgResult<()> {
        self.graph.run(q).await.map_err(|e| map_error(context, e))
    }

    /// Run a query and read one integer column from every row.
    async fn fetch_counts(&self, q: Query, column: &str, context: &str) -> KgResult<Vec<i64>> {
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_error(context, e))?;
        let mut out = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| map_error(context, e))? {
            out.push(row.get::<i64>(column).unwrap_or_default());
        }
        Ok(out)
    }

    async fn fetch_count(&self, q: Query, context: &str) -> KgResult<usize> {
        let counts = self.fetch_counts(q, "count", context).await?;
        Ok(counts.into_iter().sum::<i64>().max(0) as usize)
    }

    async fn fetch_grouped(&self, q: Query, context: &str) -> KgResult<BTreeMap<String, usize>> {
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_error(context, e))?;
        let mut out = BTreeMap::new();
        while let Some(row) = stream.next().await.map_err(|e| map_error(context, e))? {
            let label: String = row.get("label").unwrap_or_default();
            let count: i64 = row.get("count").unwrap_or_default();
            out.insert(label, count.max(0) as usize);
        }
        Ok(out)
    }

    async fn merge_node(&self, node: &Node) -> KgResult<()> {
        let statement = cypher::merge_node(&node.node_type, &node.labels, node.embedding.is_some());
        let mut q = query(&statement)
            .param("id", node.id.clone())
            .param("props", properties_to_bolt(&node.properties));
        if let Some(ref embedding) = node.embedding {
            q = q.param("embedding", vector_to_f64(embedding));
        }
        self.run(q, "Failed to merge node").await
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn verify_connectivity(&self) -> KgResult<()> {
        self.fetch_count(query("RETURN 1 AS count"), "Neo4j unreachable")
            .await
            .map(|_| ())
    }

    async fn delete_all(&self) -> KgResult<()> {
        info!("Deleting all nodes and relationships");
        self.run(query(cypher::DELETE_ALL), "Failed to delete graph").await
    }

    async fn create_vector_index(&self, index: &VectorIndexConfig) -> KgResult<()> {
        info!(
            name = %index.name,
            dimensions = index.dimensions,
            similarity = %index.similarity,
            "Creating vector index"
        );
        self.graph
            .run(query(&cypher::create_vector_index(index)))
            .await
            .map_err(|e| KgError::index(format!("Failed to create vector index: {}", e)))
    }

    async fn drop_index(&self, name: &str) -> KgResult<()> {
        self.graph
            .run(query(&cypher::drop_index(name)))
            .await
            .map_err(|e| KgError::index(format!("Failed to drop index {}: {}", name, e)))
    }

    async fn vector_index_dimensions(&self, name: &str) -> KgResult<Option<usize>> {
        let q = query(cypher::VECTOR_INDEX_DIMENSIONS).param("name", name.to_string());
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_error("Failed to list vector indexes", e))?;
        match stream
            .next()
            .await
            .map_err(|e| map_error("Failed to list vector indexes", e))?
        {
            Some(row) => Ok(row
                .get::<Option<i64>>("dims")
                .unwrap_or_default()
                .map(|d| d.max(0) as usize)),
            None => Ok(None),
        }
    }

    async fn create_unique_constraint(&self, label: &str, property: &str) -> KgResult<()> {
        debug!(label, property, "Creating uniqueness constraint");
        self.run(
            query(&cypher::create_unique_constraint(label, property)),
            "Failed to create constraint",
        )
        .await
    }

    async fn add_graph_document(&self, document: &GraphDocument) -> KgResult<usize> {
        for node in &document.nodes {
            self.merge_node(node).await?;
        }

        let mut written = 0;
        for rel in &document.relationships {
            let q = query(&cypher::merge_relationship(&rel.relationship_type))
                .param("source", rel.source.clone())
                .param("target", rel.target.clone())
                .param("props", properties_to_bolt(&rel.properties));
            let count = self.fetch_counts(q, "written", "Failed to merge relationship").await?;
            if count.iter().sum::<i64>() > 0 {
                written += 1;
            } else {
                debug!(triple = %rel.triple(), "Relationship endpoints missing, skipped");
            }
        }

        info!(
            nodes = document.nodes.len(),
            relationships = written,
            "Wrote graph document"
        );
        Ok(written)
    }

    async fn set_vector(&self, node_id: &str, property: &str, vector: &[f32]) -> KgResult<()> {
        let q = query(&cypher::set_vector(property))
            .param("id", node_id.to_string())
            .param("vector", vector_to_f64(vector));
        self.run(q, "Failed to set vector").await
    }

    async fn label_nodes_with_property(&self, label: &str, property: &str) -> KgResult<usize> {
        self.fetch_count(
            query(&cypher::label_nodes_with_property(label, property)),
            "Failed to label nodes",
        )
        .await
    }

    async fn nodes_missing_vector(
        &self,
        label: &str,
        vector_property: &str,
        text_property: &str,
    ) -> KgResult<Vec<PendingNode>> {
        let q = query(&cypher::nodes_missing_vector(label, vector_property, text_property));
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_error("Failed to list nodes without vectors", e))?;

        let mut pending = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| map_error("Failed to fetch row", e))?
        {
            let id: String = row.get("id").unwrap_or_default();
            let text: String = row.get("text").unwrap_or_else(|_| id.clone());
            pending.push(PendingNode { id, text });
        }
        Ok(pending)
    }

    async fn vector_search(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
        return_properties: &[String],
    ) -> KgResult<Vec<ScoredNode>> {
        let q = query(&cypher::vector_search(return_properties))
            .param("index", index_name.to_string())
            .param("k", top_k as i64)
            .param("vector", vector_to_f64(vector));
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_error("Vector search failed", e))?;

        let mut hits = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| map_error("Failed to fetch row", e))?
        {
            hits.push(ScoredNode {
                id: row.get("id").unwrap_or_default(),
                labels: row.get("labels").unwrap_or_default(),
                properties: row.get::<Properties>("properties").unwrap_or_default(),
                score: row.get::<f64>("score").unwrap_or_default() as f32,
            });
        }
        Ok(hits)
    }

    async fn neighborhood(&self, node_id: &str, limit: usize) -> KgResult<Vec<GraphTriple>> {
        let q = query(cypher::NEIGHBORHOOD)
            .param("id", node_id.to_string())
            .param("limit", limit as i64);
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_error("Failed to fetch neighborhood", e))?;

        let mut triples = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| map_error("Failed to fetch row", e))?
        {
            triples.push(GraphTriple::new(
                row.get::<String>("source").unwrap_or_default(),
                row.get::<String>("relationship").unwrap_or_default(),
                row.get::<String>("target").unwrap_or_default(),
            ));
        }
        Ok(triples)
    }

    async fn stats(&self) -> KgResult<GraphStats> {
        Ok(GraphStats {
            nodes: self.fetch_count(query(cypher::COUNT_NODES), "Failed to count nodes").await?,
            relationships: self
                .fetch_count(query(cypher::COUNT_RELATIONSHIPS), "Failed to count relationships")
                .await?,
            embedded_nodes: self
                .fetch_count(
                    query(&cypher::count_with_property(EMBEDDING_PROPERTY)),
                    "Failed to count embedded nodes",
                )
                .await?,
            nodes_by_label: self
                .fetch_grouped(
                    query(cypher::NODES_BY_LABEL).param("generic", ENTITY_LABEL),
                    "Failed to count labels",
                )
                .await?,
            relationships_by_type: self
                .fetch_grouped(query(cypher::RELATIONSHIPS_BY_TYPE), "Failed to count types")
                .await?,
        })
    }

    async fn read_query(&self, cypher: &str) -> KgResult<Vec<Properties>> {
        ensure_read_only(cypher)?;
        debug!(cypher, "Running read query");
        let mut stream = self
            .graph
            .execute(query(cypher))
            .await
            .map_err(|e| map_error("Cypher query failed", e))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| map_error("Failed to fetch row", e))?
        {
            let columns: BTreeMap<String, serde_json::Value> = row
                .to()
                .map_err(|e| KgError::graph_store(format!("Unreadable query row: {}", e)))?;
            rows.push(
                columns
                    .into_iter()
                    .filter_map(|(key, value)| from_json(value).map(|v| (key, v)))
                    .collect(),
            );
        }
        Ok(rows)
    }
}
