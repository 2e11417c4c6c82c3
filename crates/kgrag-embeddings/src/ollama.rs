//! Ollama embedding provider implementation.

use async_trait::async_trait;

use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{Embedder, EmbedderConfig, EmbedderProvider, EmbeddingAction};

#[cfg(feature = "ollama")]
use ollama_rs::{generation::embeddings::request::GenerateEmbeddingsRequest, Ollama};

#[cfg(feature = "ollama")]
fn map_error<E: std::error::Error + 'static>(e: E) -> KgError {
    if kgrag_core::error::is_transport_failure(&e) {
        KgError::provider_unreachable(format!("Ollama server unreachable: {}", e))
    } else {
        KgError::embedding(format!("Ollama embedding error: {}", e))
    }
}

/// Ollama embedding provider.
pub struct OllamaEmbedder {
    #[cfg(feature = "ollama")]
    client: Ollama,
    config: EmbedderConfig,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder.
    pub fn new(config: EmbedderConfig) -> KgResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let url = url::Url::parse(&base_url)
            .map_err(|e| KgError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        let host = url.host_str().unwrap_or("localhost").to_string();
        let port = url.port().unwrap_or(11434);

        #[cfg(feature = "ollama")]
        let client = Ollama::new(format!("{}://{}", url.scheme(), host), port);
        #[cfg(not(feature = "ollama"))]
        let _ = (host, port);

        let mut config = config;
        if config.model.is_empty() {
            config.model = EmbedderProvider::Ollama.default_model().to_string();
        }

        Ok(Self {
            #[cfg(feature = "ollama")]
            client,
            config,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[cfg(feature = "ollama")]
    async fn embed(&self, text: &str, _action: Option<EmbeddingAction>) -> KgResult<Vec<f32>> {
        let request = GenerateEmbeddingsRequest::new(self.config.model.clone(), text.into());

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(map_error)?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| KgError::embedding("No embedding returned"))
    }

    #[cfg(not(feature = "ollama"))]
    async fn embed(&self, _text: &str, _action: Option<EmbeddingAction>) -> KgResult<Vec<f32>> {
        Err(KgError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dims
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_url() {
        let config = EmbedderConfig {
            base_url: Some("no scheme here".into()),
            ..Default::default()
        };
        assert!(matches!(
            OllamaEmbedder::new(config),
            Err(KgError::Configuration(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let embedder = OllamaEmbedder::new(EmbedderConfig {
            model: String::new(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        assert_eq!(embedder.dimension(), 768);
    }

    #[cfg(feature = "ollama")]
    #[tokio::test]
    async fn test_unreachable_server_is_connectivity_error() {
        let embedder = OllamaEmbedder::new(EmbedderConfig {
            base_url: Some("http://127.0.0.1:1".into()),
            ..Default::default()
        })
        .unwrap();

        let err = embedder.embed("Apple", None).await.unwrap_err();
        assert_eq!(err.kind(), kgrag_core::ErrorKind::Connectivity);
    }
}
