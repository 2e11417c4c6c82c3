//! Factory for creating embedding providers.

use std::sync::Arc;

use tracing::info;

use kgrag_core::config::EmbedderProviderConfig;
use kgrag_core::error::KgResult;
use kgrag_core::traits::{Embedder, EmbedderConfig, EmbedderProvider};

use crate::gemini::GeminiEmbedder;
use crate::ollama::OllamaEmbedder;
use crate::openai::OpenAIEmbedder;

/// Factory for creating embedding providers.
pub struct EmbedderFactory;

impl EmbedderFactory {
    /// Create an embedder from the given configuration.
    pub fn create(provider: EmbedderProvider, config: EmbedderConfig) -> KgResult<Arc<dyn Embedder>> {
        info!(%provider, model = %config.model, dims = config.embedding_dims, "Creating embedder");
        match provider {
            EmbedderProvider::OpenAI => {
                let embedder = OpenAIEmbedder::new(config)?;
                Ok(Arc::new(embedder))
            }
            EmbedderProvider::Ollama => {
                let embedder = OllamaEmbedder::new(config)?;
                Ok(Arc::new(embedder))
            }
            EmbedderProvider::Gemini => {
                let embedder = GeminiEmbedder::new(config)?;
                Ok(Arc::new(embedder))
            }
        }
    }

    /// Create the embedder described by a provider section of the config file.
    pub fn from_config(config: &EmbedderProviderConfig) -> KgResult<Arc<dyn Embedder>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create an Ollama embedder with default configuration.
    pub fn ollama() -> KgResult<Arc<dyn Embedder>> {
        Self::create(EmbedderProvider::Ollama, EmbedderConfig::default())
    }

    /// Create an Ollama embedder with a specific model.
    pub fn ollama_with_model(model: impl Into<String>, dims: usize) -> KgResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            ..Default::default()
        };
        Self::create(EmbedderProvider::Ollama, config)
    }

    /// Create an OpenAI embedder with a specific model.
    pub fn openai_with_model(model: impl Into<String>, dims: usize) -> KgResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            ..Default::default()
        };
        Self::create(EmbedderProvider::OpenAI, config)
    }

    /// Create a Gemini embedder with a specific model.
    pub fn gemini_with_model(model: impl Into<String>, dims: usize) -> KgResult<Arc<dyn Embedder>> {
        let config = EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            ..Default::default()
        };
        Self::create(EmbedderProvider::Gemini, config)
    }
}
