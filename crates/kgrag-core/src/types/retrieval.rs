//! Retrieval results.

use serde::{Deserialize, Serialize};

use super::graph::{GraphTriple, Properties};

/// A node returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub id: String,
    pub labels: Vec<String>,
    /// Requested properties that were present on the node.
    #[serde(default)]
    pub properties: Properties,
    /// Similarity score (higher is closer).
    pub score: f32,
}

/// One retrieved node with its graph context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub node: ScoredNode,
    /// Direct neighbours of the node, empty for plain vector retrieval.
    #[serde(default)]
    pub context: Vec<GraphTriple>,
}

impl RetrievedItem {
    /// Render the item as prompt context.
    pub fn render(&self) -> String {
        let mut out = format!("Main Entity: {}", self.node.id);
        for (key, value) in &self.node.properties {
            out.push_str(&format!("\n{}: {}", key, value));
        }
        for triple in &self.context {
            out.push_str(&format!("\n{}", triple));
        }
        out
    }
}

/// All items returned for one query, ordered by score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieverResult {
    pub items: Vec<RetrievedItem>,
    /// Query the items were read with, for generated queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cypher: Option<String>,
}

impl RetrieverResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render all items as one context block.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(RetrievedItem::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Answer produced by the retrieval-augmented generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RetrieverResult>,
}
