//! Google Gemini embedding provider (`embedContent` REST endpoint).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{Embedder, EmbedderConfig, EmbedderProvider, EmbeddingAction};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini embedding provider.
pub struct GeminiEmbedder {
    client: Client,
    config: EmbedderConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Task type the API uses to specialise the vector.
fn task_type(action: Option<EmbeddingAction>) -> &'static str {
    match action.unwrap_or_default() {
        EmbeddingAction::Add => "RETRIEVAL_DOCUMENT",
        EmbeddingAction::Search => "RETRIEVAL_QUERY",
    }
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder.
    pub fn new(config: EmbedderConfig) -> KgResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                KgError::missing_credentials("Google API key not found. Set GOOGLE_API_KEY environment variable or provide api_key in config.")
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            api_key
                .parse()
                .map_err(|_| KgError::Configuration("Invalid API key format".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| KgError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GEMINI_API_URL.to_string());

        let mut config = config;
        if config.model.is_empty() {
            config.model = EmbedderProvider::Gemini.default_model().to_string();
        }
        config.model = config.model.trim_start_matches("models/").to_string();

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn build_request<'a>(&self, text: &'a str, action: Option<EmbeddingAction>) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.config.model),
            content: Content {
                parts: [Part { text }],
            },
            task_type: task_type(action),
            // text-embedding-004 is fixed at 768; newer models truncate on request
            output_dimensionality: (self.config.model != "text-embedding-004")
                .then_some(self.config.embedding_dims),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str, action: Option<EmbeddingAction>) -> KgResult<Vec<f32>> {
        let request = self.build_request(text, action);
        debug!(model = %self.config.model, task_type = request.task_type, "Embedding text");

        let response = self
            .client
            .post(format!("{}/models/{}:embedContent", self.base_url, self.config.model))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    KgError::provider_unreachable(format!("Gemini API unreachable: {}", e))
                } else {
                    KgError::embedding(format!("Gemini API request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KgError::embedding(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(match status.as_u16() {
                401 | 403 | 429 => KgError::from_http_status(status.as_u16(), &message),
                _ => KgError::embedding(format!("Gemini API error ({}): {}", status, message)),
            });
        }

        let response: EmbedContentResponse = serde_json::from_str(&body)
            .map_err(|e| KgError::embedding(format!("Failed to parse response: {}", e)))?;

        Ok(response.embedding.values)
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

    fn embedder(model: &str, dims: usize) -> GeminiEmbedder {
        GeminiEmbedder::new(EmbedderConfig {
            model: model.into(),
            embedding_dims: dims,
            api_key: Some("test-key".into()),
            base_url: None,
        })
        .unwrap()
    }

    #[test]
    fn test_task_type_follows_action() {
        assert_eq!(task_type(None), "RETRIEVAL_DOCUMENT");
        assert_eq!(task_type(Some(EmbeddingAction::Search)), "RETRIEVAL_QUERY");
    }

    #[test]
    fn test_request_shape() {
        let embedder = embedder("models/text-embedding-004", 768);
        assert_eq!(embedder.model_name(), "text-embedding-004");

        let json = serde_json::to_value(embedder.build_request("Apple", Some(EmbeddingAction::Search))).unwrap();
        assert_eq!(json["model"], "models/text-embedding-004");
        assert_eq!(json["content"]["parts"][0]["text"], "Apple");
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert!(json.get("outputDimensionality").is_none());
    }

    #[test]
    fn test_output_dimensionality_for_newer_models() {
        let embedder = embedder("gemini-embedding-001", 1536);
        let json = serde_json::to_value(embedder.build_request("x", None)).unwrap();
        assert_eq!(json["outputDimensionality"], 1536);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connectivity_error() {
        let embedder = GeminiEmbedder::new(EmbedderConfig {
            api_key: Some("test-key".into()),
            base_url: Some("http://127.0.0.1:1".into()),
            ..Default::default()
        })
        .unwrap();

        let err = embedder.embed("Apple", None).await.unwrap_err();
        assert_eq!(err.kind(), kgrag_core::ErrorKind::Connectivity);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"embedding": {"values": [0.1, -0.2, 0.3]}}"#;
        let response: EmbedContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.embedding.values.len(), 3);
    }
}
