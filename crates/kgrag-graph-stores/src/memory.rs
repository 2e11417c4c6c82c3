//! In-process graph store on petgraph.
//!
//! Mirrors the merge semantics of the Neo4j store (nodes keyed by id,
//! relationships by source/type/target) and answers vector queries by
//! brute force. Nothing survives the process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{GraphStore, PendingNode, SimilarityFunction, VectorIndexConfig};
use kgrag_core::types::{
    GraphDocument, GraphStats, GraphTriple, Properties, ScoredNode, EMBEDDING_PROPERTY,
    ENTITY_LABEL,
};

/// Node payload.
#[derive(Debug, Clone)]
struct StoredNode {
    id: String,
    node_type: String,
    labels: Vec<String>,
    properties: Properties,
    vectors: HashMap<String, Vec<f32>>,
}

impl StoredNode {
    fn has_label(&self, label: &str) -> bool {
        self.node_type == label || self.labels.iter().any(|l| l == label)
    }

    fn add_label(&mut self, label: &str) {
        if !self.has_label(label) {
            self.labels.push(label.to_string());
        }
    }

    fn all_labels(&self) -> Vec<String> {
        std::iter::once(self.node_type.clone())
            .chain(self.labels.iter().cloned())
            .collect()
    }
}

/// Edge payload.
#[derive(Debug, Clone)]
struct StoredEdge {
    relationship_type: String,
    properties: Properties,
}

#[derive(Default)]
struct State {
    graph: DiGraph<StoredNode, StoredEdge>,
    ids: HashMap<String, NodeIndex>,
    indexes: HashMap<String, VectorIndexConfig>,
    constraints: HashSet<(String, String)>,
}

impl State {
    fn node(&self, id: &str) -> Option<&StoredNode> {
        self.ids.get(id).and_then(|&idx| self.graph.node_weight(idx))
    }
}

/// Graph store kept in memory.
#[derive(Default)]
pub struct MemoryGraphStore {
    state: Mutex<State>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> KgResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| KgError::Internal(format!("Graph lock poisoned: {}", e)))
    }

    /// Ids of all nodes carrying `label`, sorted.
    pub fn node_ids_with_label(&self, label: &str) -> KgResult<Vec<String>> {
        let state = self.lock()?;
        let mut ids: Vec<String> = state
            .graph
            .node_weights()
            .filter(|n| n.has_label(label))
            .map(|n| n.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// All relationships as triples, sorted.
    pub fn triples(&self) -> KgResult<Vec<GraphTriple>> {
        let state = self.lock()?;
        let mut triples: Vec<GraphTriple> = state
            .graph
            .edge_references()
            .map(|e| {
                GraphTriple::new(
                    &state.graph[e.source()].id,
                    &e.weight().relationship_type,
                    &state.graph[e.target()].id,
                )
            })
            .collect();
        triples.sort_by(|a, b| {
            (&a.source, &a.relationship, &a.target).cmp(&(&b.source, &b.relationship, &b.target))
        });
        Ok(triples)
    }

    /// Properties of a node, if it exists.
    pub fn node_properties(&self, id: &str) -> KgResult<Option<Properties>> {
        Ok(self.lock()?.node(id).map(|n| n.properties.clone()))
    }

    /// Relationship properties of the first `source -[type]-> target` edge.
    pub fn relationship_properties(
        &self,
        source: &str,
        relationship_type: &str,
        target: &str,
    ) -> KgResult<Option<Properties>> {
        let state = self.lock()?;
        let (Some(&s), Some(&t)) = (state.ids.get(source), state.ids.get(target)) else {
            return Ok(None);
        };
        Ok(state
            .graph
            .edges_connecting(s, t)
            .find(|e| e.weight().relationship_type == relationship_type)
            .map(|e| e.weight().properties.clone()))
    }

    /// Vector stored on a node under `property`.
    pub fn vector(&self, id: &str, property: &str) -> KgResult<Option<Vec<f32>>> {
        Ok(self
            .lock()?
            .node(id)
            .and_then(|n| n.vectors.get(property).cloned()))
    }

    /// Whether a uniqueness constraint was registered.
    pub fn has_constraint(&self, label: &str, property: &str) -> KgResult<bool> {
        Ok(self
            .lock()?
            .constraints
            .contains(&(label.to_string(), property.to_string())))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Similarity score, higher is closer. Both are mapped into [0, 1] the way
/// Neo4j reports vector index scores.
fn score(similarity: SimilarityFunction, a: &[f32], b: &[f32]) -> f32 {
    match similarity {
        SimilarityFunction::Cosine => (1.0 + cosine(a, b)) / 2.0,
        SimilarityFunction::Euclidean => {
            let d2: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
            1.0 / (1.0 + d2)
        }
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn verify_connectivity(&self) -> KgResult<()> {
        self.lock().map(|_| ())
    }

    async fn delete_all(&self) -> KgResult<()> {
        let mut state = self.lock()?;
        state.graph.clear();
        state.ids.clear();
        Ok(())
    }

    async fn create_vector_index(&self, index: &VectorIndexConfig) -> KgResult<()> {
        let mut state = self.lock()?;
        state
            .indexes
            .entry(index.name.clone())
            .or_insert_with(|| index.clone());
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> KgResult<()> {
        self.lock()?.indexes.remove(name);
        Ok(())
    }

    async fn vector_index_dimensions(&self, name: &str) -> KgResult<Option<usize>> {
        Ok(self.lock()?.indexes.get(name).map(|i| i.dimensions))
    }

    async fn create_unique_constraint(&self, label: &str, property: &str) -> KgResult<()> {
        self.lock()?
            .constraints
            .insert((label.to_string(), property.to_string()));
        Ok(())
    }

    async fn add_graph_document(&self, document: &GraphDocument) -> KgResult<usize> {
        let mut state = self.lock()?;

        for node in &document.nodes {
            match state.ids.get(&node.id).copied() {
                Some(idx) => {
                    let stored = &mut state.graph[idx];
                    stored.add_label(&node.node_type);
                    for label in &node.labels {
                        stored.add_label(label);
                    }
                    stored.properties.extend(node.properties.clone());
                    if let Some(ref embedding) = node.embedding {
                        stored
                            .vectors
                            .insert(EMBEDDING_PROPERTY.to_string(), embedding.clone());
                    }
                }
                None => {
                    let mut vectors = HashMap::new();
                    if let Some(ref embedding) = node.embedding {
                        vectors.insert(EMBEDDING_PROPERTY.to_string(), embedding.clone());
                    }
                    let idx = state.graph.add_node(StoredNode {
                        id: node.id.clone(),
                        node_type: node.node_type.clone(),
                        labels: node.labels.clone(),
                        properties: node.properties.clone(),
                        vectors,
                    });
                    state.ids.insert(node.id.clone(), idx);
                }
            }
        }

        let mut written = 0;
        for rel in &document.relationships {
            let (Some(&s), Some(&t)) = (state.ids.get(&rel.source), state.ids.get(&rel.target))
            else {
                debug!(triple = %rel.triple(), "Relationship endpoints missing, skipped");
                continue;
            };
            let existing = state
                .graph
                .edges_connecting(s, t)
                .find(|e| e.weight().relationship_type == rel.relationship_type)
                .map(|e| e.id());
            match existing {
                Some(edge) => {
                    if let Some(weight) = state.graph.edge_weight_mut(edge) {
                        weight.properties.extend(rel.properties.clone());
                    }
                }
                None => {
                    state.graph.add_edge(
                        s,
                        t,
                        StoredEdge {
                            relationship_type: rel.relationship_type.clone(),
                            properties: rel.properties.clone(),
                        },
                    );
                }
            }
            written += 1;
        }
        Ok(written)
    }

    async fn set_vector(&self, node_id: &str, property: &str, vector: &[f32]) -> KgResult<()> {
        let mut state = self.lock()?;
        let idx = *state
            .ids
            .get(node_id)
            .ok_or_else(|| KgError::graph_store(format!("Node not found: {}", node_id)))?;
        state.graph[idx]
            .vectors
            .insert(property.to_string(), vector.to_vec());
        Ok(())
    }

    async fn label_nodes_with_property(&self, label: &str, property: &str) -> KgResult<usize> {
        let mut state = self.lock()?;
        let mut count = 0;
        for node in state.graph.node_weights_mut() {
            if node.vectors.contains_key(property) || node.properties.contains_key(property) {
                node.add_label(label);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn nodes_missing_vector(
        &self,
        label: &str,
        vector_property: &str,
        text_property: &str,
    ) -> KgResult<Vec<PendingNode>> {
        let state = self.lock()?;
        let mut pending: Vec<PendingNode> = state
            .graph
            .node_weights()
            .filter(|n| n.has_label(label) && !n.vectors.contains_key(vector_property))
            .map(|n| PendingNode {
                id: n.id.clone(),
                text: n
                    .properties
                    .get(text_property)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| n.id.clone()),
            })
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pending)
    }

    async fn vector_search(
        &self,
        index_name: &str,
        vector: &[f32],
        top_k: usize,
        return_properties: &[String],
    ) -> KgResult<Vec<ScoredNode>> {
        let state = self.lock()?;
        let index = state
            .indexes
            .get(index_name)
            .ok_or_else(|| KgError::index(format!("No such vector index: {}", index_name)))?;
        if vector.len() != index.dimensions {
            return Err(KgError::dimension_mismatch(index.dimensions, vector.len()));
        }

        let mut hits: Vec<ScoredNode> = state
            .graph
            .node_weights()
            .filter(|n| n.has_label(&index.label))
            .filter_map(|n| {
                let stored = n.vectors.get(&index.property)?;
                // Vectors of another size are invisible to the index
                if stored.len() != index.dimensions {
                    return None;
                }
                let properties: BTreeMap<_, _> = return_properties
                    .iter()
                    .filter_map(|p| n.properties.get(p).map(|v| (p.clone(), v.clone())))
                    .collect();
                Some(ScoredNode {
                    id: n.id.clone(),
                    labels: n.all_labels(),
                    properties,
                    score: score(index.similarity, vector, stored),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn neighborhood(&self, node_id: &str, limit: usize) -> KgResult<Vec<GraphTriple>> {
        let state = self.lock()?;
        let Some(&idx) = state.ids.get(node_id) else {
            return Ok(Vec::new());
        };

        let outgoing = state.graph.edges_directed(idx, Direction::Outgoing);
        let incoming = state.graph.edges_directed(idx, Direction::Incoming);
        Ok(outgoing
            .chain(incoming)
            .map(|e| {
                GraphTriple::new(
                    &state.graph[e.source()].id,
                    &e.weight().relationship_type,
                    &state.graph[e.target()].id,
                )
            })
            .take(limit)
            .collect())
    }

    async fn stats(&self) -> KgResult<GraphStats> {
        let state = self.lock()?;
        let mut stats = GraphStats {
            nodes: state.graph.node_count(),
            relationships: state.graph.edge_count(),
            ..Default::default()
        };
        for node in state.graph.node_weights() {
            if node.vectors.contains_key(EMBEDDING_PROPERTY) {
                stats.embedded_nodes += 1;
            }
            let label = if node.node_type == ENTITY_LABEL {
                node.labels.first().unwrap_or(&node.node_type)
            } else {
                &node.node_type
            };
            *stats.nodes_by_label.entry(label.clone()).or_default() += 1;
        }
        for edge in state.graph.edge_weights() {
            *stats
                .relationships_by_type
                .entry(edge.relationship_type.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }

    async fn read_query(&self, _cypher: &str) -> KgResult<Vec<Properties>> {
        Err(KgError::graph_store(
            "The in-memory store cannot run Cypher; use the neo4j store",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrag_core::types::{Node, PropertyValue, Relationship};

    fn document() -> GraphDocument {
        GraphDocument::new(
            vec![
                Node::new("Steve Jobs", "Person").with_embedding(vec![1.0, 0.0, 0.0]),
                Node::new("Apple", "Organization").with_embedding(vec![0.0, 1.0, 0.0]),
                Node::new("California", "Location"),
            ],
            vec![
                Relationship::new("Steve Jobs", "Apple", "FOUNDED").with_property("time", "1976"),
                Relationship::new("Apple", "California", "LOCATED_IN"),
                Relationship::new("Apple", "Nowhere", "LOCATED_IN"),
            ],
        )
    }

    #[tokio::test]
    async fn test_read_query_is_unsupported() {
        let store = MemoryGraphStore::new();
        let err = store.read_query("MATCH (n) RETURN count(n)").await.unwrap_err();
        assert!(!err.is_item_recoverable());
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let store = MemoryGraphStore::new();
        assert_eq!(store.add_graph_document(&document()).await.unwrap(), 2);
        assert_eq!(store.add_graph_document(&document()).await.unwrap(), 2);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.nodes, 3);
        assert_eq!(stats.relationships, 2);
        assert_eq!(stats.embedded_nodes, 2);
        assert_eq!(stats.relationships_by_type["LOCATED_IN"], 1);
        assert_eq!(
            store
                .relationship_properties("Steve Jobs", "FOUNDED", "Apple")
                .unwrap()
                .unwrap()["time"],
            PropertyValue::from("1976")
        );
    }

    #[tokio::test]
    async fn test_vector_search_ranks_by_similarity() {
        let store = MemoryGraphStore::new();
        store.add_graph_document(&document()).await.unwrap();
        store
            .label_nodes_with_property(ENTITY_LABEL, EMBEDDING_PROPERTY)
            .await
            .unwrap();
        store
            .create_vector_index(&VectorIndexConfig::default().with_dimensions(3))
            .await
            .unwrap();

        let hits = store
            .vector_search("entity_index", &[0.1, 0.9, 0.0], 5, &[])
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "Apple");
        assert!(hits[0].score > hits[1].score);
        assert!(hits[0].labels.contains(&ENTITY_LABEL.to_string()));

        let err = store
            .vector_search("entity_index", &[0.1, 0.9], 5, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, KgError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn test_index_is_created_once() {
        let store = MemoryGraphStore::new();
        let index = VectorIndexConfig::default().with_dimensions(3);
        store.create_vector_index(&index).await.unwrap();
        store
            .create_vector_index(&index.clone().with_dimensions(768))
            .await
            .unwrap();
        assert_eq!(store.vector_index_dimensions("entity_index").await.unwrap(), Some(3));

        store.drop_index("entity_index").await.unwrap();
        store.drop_index("entity_index").await.unwrap();
        assert_eq!(store.vector_index_dimensions("entity_index").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_neighborhood_covers_both_directions() {
        let store = MemoryGraphStore::new();
        store.add_graph_document(&document()).await.unwrap();

        let triples = store.neighborhood("Apple", 15).await.unwrap();
        assert_eq!(triples.len(), 2);
        assert!(triples.contains(&GraphTriple::new("Steve Jobs", "FOUNDED", "Apple")));
        assert!(triples.contains(&GraphTriple::new("Apple", "LOCATED_IN", "California")));

        assert_eq!(store.neighborhood("Apple", 1).await.unwrap().len(), 1);
        assert!(store.neighborhood("Unknown", 15).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nodes_missing_vector_and_set_vector() {
        let store = MemoryGraphStore::new();
        let doc = GraphDocument::new(
            vec![
                Node::new("Toy Story", "Movie").with_property("plot", "Toys come alive."),
                Node::new("Up", "Movie"),
            ],
            vec![],
        );
        store.add_graph_document(&doc).await.unwrap();

        let pending = store
            .nodes_missing_vector("Movie", "plotEmbedding", "plot")
            .await
            .unwrap();
        assert_eq!(
            pending,
            vec![
                PendingNode { id: "Toy Story".into(), text: "Toys come alive.".into() },
                PendingNode { id: "Up".into(), text: "Up".into() },
            ]
        );

        store.set_vector("Up", "plotEmbedding", &[0.5, 0.5]).await.unwrap();
        assert_eq!(
            store.nodes_missing_vector("Movie", "plotEmbedding", "plot").await.unwrap().len(),
            1
        );
        assert!(store.set_vector("Missing", "plotEmbedding", &[1.0]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_all_keeps_indexes() {
        let store = MemoryGraphStore::new();
        store.add_graph_document(&document()).await.unwrap();
        store
            .create_vector_index(&VectorIndexConfig::default())
            .await
            .unwrap();

        store.delete_all().await.unwrap();
        assert_eq!(store.stats().await.unwrap().nodes, 0);
        assert_eq!(store.vector_index_dimensions("entity_index").await.unwrap(), Some(768));
    }

    #[test]
    fn test_scores() {
        assert!((score(SimilarityFunction::Cosine, &[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((score(SimilarityFunction::Cosine, &[1.0, 0.0], &[-1.0, 0.0])).abs() < 1e-6);
        assert!((score(SimilarityFunction::Euclidean, &[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
