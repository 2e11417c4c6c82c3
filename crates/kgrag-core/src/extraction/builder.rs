//! End-to-end graph construction: extract, merge, validate, embed, store.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::KgResult;
use crate::throttle::Throttle;
use crate::traits::{Embedder, EmbeddingAction, GraphStore, SimilarityFunction, VectorIndexConfig};
use crate::types::{GraphDocument, Node, Relationship, EMBEDDING_PROPERTY, ENTITY_LABEL};

use super::chunking::split_into_sections;
use super::extractor::GraphExtractor;
use super::normalize::{merge_nodes, validate_relationships};

/// Options of one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Delete all data and drop the vector index first.
    pub reset: bool,
    /// Pause between embedding calls.
    pub embed_delay: Duration,
    /// Sections shorter than this are skipped.
    pub min_section_chars: usize,
    /// Name of the vector index over embedded nodes.
    pub index_name: String,
    pub similarity: SimilarityFunction,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            reset: false,
            embed_delay: Duration::ZERO,
            min_section_chars: 100,
            index_name: VectorIndexConfig::default().name,
            similarity: SimilarityFunction::Cosine,
        }
    }
}

/// What a build run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Sections sent to the extractor.
    pub sections: usize,
    pub sections_skipped: usize,
    /// Nodes before merging.
    pub extracted_nodes: usize,
    pub merged_nodes: usize,
    pub extracted_relationships: usize,
    pub valid_relationships: usize,
    /// Relationships referring to a node that was never extracted.
    pub dropped_relationships: usize,
    /// Relationships the store actually wrote.
    pub written_relationships: usize,
    pub embedded_nodes: usize,
    pub embedding_failures: usize,
    /// Vectors dropped because their length differed from the run's.
    pub dimension_mismatches: usize,
    /// Dimensionality observed in this run.
    pub dimensions: Option<usize>,
    /// Whether the vector index exists with matching dimensionality.
    pub index_ready: bool,
}

/// Runs the whole extraction pipeline against a store.
pub struct GraphBuilder {
    extractor: GraphExtractor,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn GraphStore>,
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(
        extractor: GraphExtractor,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn GraphStore>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            store,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Build from one plain text, extracted as a single unit.
    pub async fn build_from_text(&self, text: &str) -> KgResult<BuildReport> {
        self.build(vec![(None, text.to_string())]).await
    }

    /// Build from a markdown document, extracted section by section.
    pub async fn build_from_document(&self, markdown: &str) -> KgResult<BuildReport> {
        let sections = split_into_sections(markdown);
        info!(sections = sections.len(), "Split document into sections");
        let units = sections
            .into_iter()
            .map(|s| (Some(s.title), s.content))
            .collect();
        self.build(units).await
    }

    async fn build(&self, units: Vec<(Option<String>, String)>) -> KgResult<BuildReport> {
        let mut report = BuildReport::default();

        if self.options.reset {
            info!("Resetting graph");
            self.store.delete_all().await?;
            self.store.drop_index(&self.options.index_name).await?;
        }

        // Extraction
        let mut nodes: Vec<Node> = Vec::new();
        let mut relationships: Vec<Relationship> = Vec::new();
        for (title, content) in &units {
            if title.is_some() && content.chars().count() < self.options.min_section_chars {
                debug!(section = ?title, "Skipping short section");
                report.sections_skipped += 1;
                continue;
            }
            info!(section = title.as_deref().unwrap_or("text"), "Extracting");
            let document = self.extractor.extract(content, title.as_deref()).await?;
            report.sections += 1;
            nodes.extend(document.nodes);
            relationships.extend(document.relationships);
        }
        report.extracted_nodes = nodes.len();
        report.extracted_relationships = relationships.len();

        // Merge and validate
        let mut merged = merge_nodes(nodes);
        let validation = validate_relationships(relationships, &merged);
        report.merged_nodes = merged.len();
        report.valid_relationships = validation.valid.len();
        report.dropped_relationships = validation.dropped_count();
        info!(
            before = report.extracted_nodes,
            after = report.merged_nodes,
            valid_relationships = report.valid_relationships,
            dropped_relationships = report.dropped_relationships,
            "Merged nodes"
        );

        // Embedding
        report.dimensions = self.embed_nodes(&mut merged, &mut report).await?;

        // Store
        let source = if units.len() == 1 { "text" } else { "document" };
        let document = GraphDocument::new(merged, validation.valid).with_source(source);
        report.written_relationships = self.store.add_graph_document(&document).await?;
        self.store
            .label_nodes_with_property(ENTITY_LABEL, EMBEDDING_PROPERTY)
            .await?;

        // Index
        if let Some(dimensions) = report.dimensions {
            report.index_ready = self.ensure_index(dimensions).await?;
        }

        info!(
            nodes = report.merged_nodes,
            relationships = report.written_relationships,
            embedded = report.embedded_nodes,
            "Build finished"
        );
        Ok(report)
    }

    /// Embed every node by its id; returns the run's dimensionality.
    async fn embed_nodes(&self, nodes: &mut [Node], report: &mut BuildReport) -> KgResult<Option<usize>> {
        let mut throttle = Throttle::new(self.options.embed_delay);
        let mut dimensions: Option<usize> = None;

        for node in nodes.iter_mut() {
            node.properties.insert("name".to_string(), node.id.clone().into());

            throttle.wait().await;
            let vector = match self.embedder.embed(&node.id, Some(EmbeddingAction::Add)).await {
                Ok(vector) => vector,
                Err(e) if e.is_item_recoverable() => {
                    warn!(node = %node.id, error = %e, "Embedding failed, storing node without vector");
                    report.embedding_failures += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match dimensions {
                None => dimensions = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    warn!(
                        node = %node.id,
                        expected,
                        actual = vector.len(),
                        "Dimension mismatch, dropping vector"
                    );
                    report.dimension_mismatches += 1;
                    continue;
                }
                Some(_) => {}
            }

            debug!(node = %node.id, "Embedded node");
            node.add_label(ENTITY_LABEL);
            node.embedding = Some(vector);
            report.embedded_nodes += 1;
        }

        Ok(dimensions)
    }

    /// Create the vector index unless a conflicting one exists.
    async fn ensure_index(&self, dimensions: usize) -> KgResult<bool> {
        let name = &self.options.index_name;
        match self.store.vector_index_dimensions(name).await? {
            Some(existing) if existing != dimensions => {
                error!(
                    index = %name,
                    existing,
                    observed = dimensions,
                    "Vector index has a different dimensionality; recreate it with `kgrag setup --recreate`"
                );
                Ok(false)
            }
            Some(_) => Ok(true),
            None => {
                let index = VectorIndexConfig {
                    name: name.clone(),
                    similarity: self.options.similarity,
                    ..Default::default()
                }
                .with_dimensions(dimensions);
                self.store.create_vector_index(&index).await?;
                info!(index = %name, dimensions, "Created vector index");
                Ok(true)
            }
        }
    }
}
