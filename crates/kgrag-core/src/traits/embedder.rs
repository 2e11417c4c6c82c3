//! Embedder trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::KgResult;

/// The action context for embedding (some providers embed documents and
/// queries differently).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingAction {
    /// Embedding a node before it is stored.
    #[default]
    Add,
    /// Embedding a query before a nearest-neighbour search.
    Search,
}

/// Core Embedder trait - all embedding providers implement this.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text.
    async fn embed(&self, text: &str, action: Option<EmbeddingAction>) -> KgResult<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(
        &self,
        texts: &[String],
        action: Option<EmbeddingAction>,
    ) -> KgResult<Vec<Vec<f32>>> {
        // Default implementation: sequential embedding
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text, action).await?);
        }
        Ok(embeddings)
    }

    /// Configured dimension of the embeddings.
    fn dimension(&self) -> usize;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Embedder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Model name/identifier.
    pub model: String,
    /// Embedding dimensions.
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_embedding_dims() -> usize {
    768
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: EmbedderProvider::Ollama.default_model().to_string(),
            embedding_dims: default_embedding_dims(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Embedder provider type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmbedderProvider {
    OpenAI,
    #[default]
    Ollama,
    Gemini,
}

impl EmbedderProvider {
    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "text-embedding-3-small",
            Self::Ollama => "nomic-embed-text",
            Self::Gemini => "text-embedding-004",
        }
    }

    /// Output size of [`default_model`](Self::default_model).
    pub fn default_dimensions(self) -> usize {
        match self {
            Self::OpenAI => 1536,
            Self::Ollama | Self::Gemini => 768,
        }
    }
}
