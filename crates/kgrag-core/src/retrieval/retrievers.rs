//! Vector and neighbourhood retrievers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::KgResult;
use crate::traits::{Embedder, EmbeddingAction, GraphStore};
use crate::types::{RetrievedItem, RetrieverResult};

/// Anything that turns a query into graph context.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` items, best first.
    async fn search(&self, query: &str, top_k: usize) -> KgResult<RetrieverResult>;
}

/// Nearest nodes of a vector index.
pub struct VectorRetriever {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    index_name: String,
    return_properties: Vec<String>,
}

impl VectorRetriever {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.into(),
            return_properties: Vec::new(),
        }
    }

    /// Node properties to include with each hit (e.g. `title`, `plot`).
    pub fn with_return_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_properties = properties.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn search(&self, query: &str, top_k: usize) -> KgResult<RetrieverResult> {
        let vector = self.embedder.embed(query, Some(EmbeddingAction::Search)).await?;
        let hits = self
            .store
            .vector_search(&self.index_name, &vector, top_k, &self.return_properties)
            .await?;
        debug!(index = %self.index_name, hits = hits.len(), "Vector search");

        Ok(RetrieverResult {
            items: hits
                .into_iter()
                .map(|node| RetrievedItem {
                    node,
                    context: Vec::new(),
                })
                .collect(),
            ..Default::default()
        })
    }
}

/// Vector hits expanded with their direct relationships.
pub struct NeighborhoodRetriever {
    vector: VectorRetriever,
    neighbor_limit: usize,
}

impl NeighborhoodRetriever {
    pub fn new(vector: VectorRetriever) -> Self {
        Self {
            vector,
            neighbor_limit: 15,
        }
    }

    /// Maximum relationships collected per hit.
    pub fn with_neighbor_limit(mut self, limit: usize) -> Self {
        self.neighbor_limit = limit;
        self
    }
}

#[async_trait]
impl Retriever for NeighborhoodRetriever {
    async fn search(&self, query: &str, top_k: usize) -> KgResult<RetrieverResult> {
        let mut result = self.vector.search(query, top_k).await?;
        for item in &mut result.items {
            item.context = self
                .vector
                .store
                .neighborhood(&item.node.id, self.neighbor_limit)
                .await?;
        }
        // Best first
        result
            .items
            .sort_by(|a, b| b.node.score.total_cmp(&a.node.score));
        Ok(result)
    }
}
