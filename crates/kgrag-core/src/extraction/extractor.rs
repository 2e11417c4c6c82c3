//! Type-guided entity and relationship extraction.
//!
//! Nodes are requested one type at a time; relationships are then requested
//! in a single call restricted to the nodes already found. Unusable model
//! output for one call is logged and contributes nothing, while connectivity
//! failures abort the extraction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{KgError, KgResult};
use crate::json_parser::parse_structured;
use crate::traits::{GenerationOptions, Llm};
use crate::types::{GraphDocument, Message, Node, Relationship};

use super::prompts::{
    node_extraction_prompt, relationship_extraction_prompt, EXTRACTION_SYSTEM_PROMPT,
};
use super::schema::{ExtractionSchema, NodeTypeSpec};

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Text sent to the model is cut to this many characters.
    pub max_chars: usize,
    /// Relationship extraction is skipped below this many nodes.
    pub min_nodes_for_relationships: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            min_nodes_for_relationships: 2,
        }
    }
}

/// Raw JSON structures for LLM response parsing.
mod raw {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct RawNode {
        #[serde(alias = "name")]
        pub id: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawNodeList {
        #[serde(default, alias = "entities")]
        pub nodes: Vec<RawNode>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawRelationship {
        pub source: Option<String>,
        pub target: Option<String>,
        #[serde(rename = "type", alias = "relation_type", alias = "relationship_type")]
        pub rel_type: Option<String>,
        #[serde(default)]
        pub time: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawRelationshipList {
        #[serde(default)]
        pub relationships: Vec<RawRelationship>,
    }
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// LLM-based, schema-guided graph extractor.
pub struct GraphExtractor {
    llm: Arc<dyn Llm>,
    schema: ExtractionSchema,
    config: ExtractorConfig,
}

impl GraphExtractor {
    /// Create a new extractor.
    pub fn new(llm: Arc<dyn Llm>, schema: ExtractionSchema) -> Self {
        Self {
            llm,
            schema,
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// Extract nodes and relationships from one text.
    ///
    /// The result is not merged: cross-type duplicates are still present and
    /// relationship endpoints are exactly what the model returned.
    pub async fn extract(&self, text: &str, section_title: Option<&str>) -> KgResult<GraphDocument> {
        let nodes = self.extract_nodes(text, section_title).await?;
        let relationships = self.extract_relationships(text, &nodes, section_title).await?;

        let source = section_title.unwrap_or("text").to_string();
        Ok(GraphDocument::new(nodes, relationships).with_source(source))
    }

    /// Ask for each allowed node type in turn.
    pub async fn extract_nodes(&self, text: &str, section_title: Option<&str>) -> KgResult<Vec<Node>> {
        let text = truncate_chars(text.trim(), self.config.max_chars);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut nodes = Vec::new();
        for node_type in &self.schema.node_types {
            match self.extract_nodes_of_type(text, node_type, section_title).await {
                Ok(found) => {
                    info!(node_type = %node_type.label, count = found.len(), "Extracted nodes");
                    nodes.extend(found);
                }
                Err(e) if e.is_item_recoverable() => {
                    warn!(node_type = %node_type.label, error = %e, "Node extraction failed, skipping type");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(nodes)
    }

    async fn extract_nodes_of_type(
        &self,
        text: &str,
        node_type: &NodeTypeSpec,
        section_title: Option<&str>,
    ) -> KgResult<Vec<Node>> {
        let prompt = node_extraction_prompt(text, node_type, &self.schema, section_title);
        let content = self.ask(prompt).await?;
        let parsed: raw::RawNodeList = parse_structured(&content)?;

        let nodes = parsed
            .nodes
            .into_iter()
            .filter_map(|raw| {
                let id = raw.id?.trim().to_string();
                if id.is_empty() {
                    return None;
                }
                debug!(node_type = %node_type.label, id = %id, "Found node");
                // The requested type wins over whatever the model wrote
                Some(Node::new(id, node_type.label.clone()))
            })
            .collect();
        Ok(nodes)
    }

    /// Ask for relationships among `nodes`.
    pub async fn extract_relationships(
        &self,
        text: &str,
        nodes: &[Node],
        section_title: Option<&str>,
    ) -> KgResult<Vec<Relationship>> {
        if nodes.len() < self.config.min_nodes_for_relationships {
            info!(nodes = nodes.len(), "Too few nodes for relationship extraction");
            return Ok(Vec::new());
        }
        if self.schema.relationship_types.is_empty() {
            return Ok(Vec::new());
        }

        let text = truncate_chars(text.trim(), self.config.max_chars);
        let prompt = relationship_extraction_prompt(text, nodes, &self.schema, section_title);

        let parsed = match self.ask(prompt).await.and_then(|c| {
            parse_structured::<raw::RawRelationshipList>(&c)
        }) {
            Ok(parsed) => parsed,
            Err(e) if e.is_item_recoverable() => {
                warn!(error = %e, "Relationship extraction failed");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let relationships: Vec<Relationship> = parsed
            .relationships
            .into_iter()
            .filter_map(Self::convert_relationship)
            .collect();
        info!(count = relationships.len(), "Extracted relationships");
        Ok(relationships)
    }

    fn convert_relationship(raw: raw::RawRelationship) -> Option<Relationship> {
        let source = raw.source?.trim().to_string();
        let target = raw.target?.trim().to_string();
        let rel_type = raw.rel_type?.trim().to_string();
        if source.is_empty() || target.is_empty() || rel_type.is_empty() {
            return None;
        }

        let mut rel = Relationship::new(source, target, rel_type);
        if let Some(time) = raw.time.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            rel = rel.with_property("time", time);
        }
        debug!(triple = %rel.triple(), "Found relationship");
        Some(rel)
    }

    async fn ask(&self, prompt: String) -> KgResult<String> {
        let messages = vec![Message::system(EXTRACTION_SYSTEM_PROMPT), Message::user(prompt)];
        let response = self
            .llm
            .generate(&messages, Some(GenerationOptions::structured()))
            .await?;

        response
            .content
            .ok_or_else(|| KgError::parse("Model returned no content"))
    }
}
