//! Backfilling vectors for nodes that were loaded without one.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::KgResult;
use crate::throttle::Throttle;
use crate::traits::{Embedder, EmbeddingAction, GraphStore, VectorIndexConfig};

/// What a backfill run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Nodes that lacked a vector.
    pub pending: usize,
    pub embedded: usize,
    pub failed: usize,
    pub dimension_mismatches: usize,
    pub dimensions: Option<usize>,
    pub index_created: bool,
}

/// Embeds a text property of every indexed node that has no vector yet.
pub struct VectorIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn GraphStore>,
    delay: Duration,
}

impl VectorIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn GraphStore>) -> Self {
        Self {
            embedder,
            store,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Embed `text_property` of nodes labeled `index.label` lacking
    /// `index.property`, then create the index if it does not exist.
    ///
    /// Vectors must match the existing index's dimensionality, or the first
    /// vector's when there is no index yet.
    pub async fn run(&self, index: &VectorIndexConfig, text_property: &str) -> KgResult<IndexReport> {
        let mut report = IndexReport::default();
        let existing = self.store.vector_index_dimensions(&index.name).await?;

        let pending = self
            .store
            .nodes_missing_vector(&index.label, &index.property, text_property)
            .await?;
        report.pending = pending.len();
        info!(label = %index.label, pending = report.pending, "Nodes without vector");

        let mut dimensions = existing;
        let mut throttle = Throttle::new(self.delay);
        for node in pending {
            throttle.wait().await;
            let vector = match self.embedder.embed(&node.text, Some(EmbeddingAction::Add)).await {
                Ok(vector) => vector,
                Err(e) if e.is_item_recoverable() => {
                    warn!(node = %node.id, error = %e, "Embedding failed, skipping node");
                    report.failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let expected = *dimensions.get_or_insert(vector.len());
            if expected != vector.len() {
                warn!(node = %node.id, expected, actual = vector.len(), "Dimension mismatch, skipping node");
                report.dimension_mismatches += 1;
                continue;
            }

            self.store.set_vector(&node.id, &index.property, &vector).await?;
            debug!(node = %node.id, "Stored vector");
            report.embedded += 1;
        }
        report.dimensions = dimensions;

        if let (None, Some(dims)) = (existing, dimensions) {
            self.store
                .create_vector_index(&index.clone().with_dimensions(dims))
                .await?;
            report.index_created = true;
            info!(index = %index.name, dimensions = dims, "Created vector index");
        }

        Ok(report)
    }
}
