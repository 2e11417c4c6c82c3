//! OpenAI embedding provider implementation.

use async_trait::async_trait;

use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{Embedder, EmbedderConfig, EmbedderProvider, EmbeddingAction};

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};

/// OpenAI embedding provider.
pub struct OpenAIEmbedder {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: EmbedderConfig,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder.
    pub fn new(config: EmbedderConfig) -> KgResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                KgError::missing_credentials("OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.")
            })?;

        #[cfg(feature = "openai")]
        let openai_config = if let Some(ref base_url) = config.base_url {
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(base_url)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };
        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        #[cfg(feature = "openai")]
        let client = Client::with_config(openai_config);

        let mut config = config;
        if config.model.is_empty() {
            config.model = EmbedderProvider::OpenAI.default_model().to_string();
        }

        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
        })
    }

    /// text-embedding-3 models can shorten their output on request.
    #[cfg(feature = "openai")]
    fn requested_dimensions(&self) -> Option<u32> {
        self.config
            .model
            .starts_with("text-embedding-3")
            .then_some(self.config.embedding_dims as u32)
    }

    #[cfg(feature = "openai")]
    async fn create(&self, input: EmbeddingInput) -> KgResult<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequest {
            model: self.config.model.clone(),
            input,
            dimensions: self.requested_dimensions(),
            ..Default::default()
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(map_error)?;

        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[cfg(feature = "openai")]
fn map_error(e: OpenAIError) -> KgError {
    match e {
        OpenAIError::Reqwest(ref err) if err.is_connect() || err.is_timeout() => {
            KgError::provider_unreachable(format!("OpenAI API unreachable: {}", e))
        }
        OpenAIError::Reqwest(ref err) => match err.status() {
            Some(status) => KgError::from_http_status(status.as_u16(), &e.to_string()),
            None => KgError::embedding(format!("OpenAI embedding error: {}", e)),
        },
        _ => KgError::embedding(format!("OpenAI embedding error: {}", e)),
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[cfg(feature = "openai")]
    async fn embed(&self, text: &str, _action: Option<EmbeddingAction>) -> KgResult<Vec<f32>> {
        self.create(EmbeddingInput::String(text.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KgError::embedding("No embedding returned"))
    }

    #[cfg(not(feature = "openai"))]
    async fn embed(&self, _text: &str, _action: Option<EmbeddingAction>) -> KgResult<Vec<f32>> {
        Err(KgError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    #[cfg(feature = "openai")]
    async fn embed_batch(
        &self,
        texts: &[String],
        _action: Option<EmbeddingAction>,
    ) -> KgResult<Vec<Vec<f32>>> {
        self.create(EmbeddingInput::StringArray(texts.to_vec())).await
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
    fn test_missing_key_is_authentication_error() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let err = OpenAIEmbedder::new(EmbedderConfig::default()).err().unwrap();
        assert!(matches!(err, KgError::Authentication { .. }));
        assert!(!err.is_item_recoverable());
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_requested_dimensions() {
        let embedder = OpenAIEmbedder::new(EmbedderConfig {
            model: "text-embedding-3-small".into(),
            embedding_dims: 512,
            api_key: Some("sk-test".into()),
            base_url: None,
        })
        .unwrap();
        assert_eq!(embedder.requested_dimensions(), Some(512));

        let embedder = OpenAIEmbedder::new(EmbedderConfig {
            model: "text-embedding-ada-002".into(),
            embedding_dims: 1536,
            api_key: Some("sk-test".into()),
            base_url: None,
        })
        .unwrap();
        assert_eq!(embedder.requested_dimensions(), None);
    }
}
