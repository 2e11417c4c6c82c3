//! Ollama LLM provider implementation.

use async_trait::async_trait;

use kgrag_core::config::LlmProvider;
use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
use kgrag_core::types::{Message, MessageRole};

#[cfg(feature = "ollama")]
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    generation::options::GenerationOptions as OllamaOptions,
    generation::parameters::FormatType,
    Ollama,
};

/// Split a base URL into the host part and port Ollama's client expects.
pub(crate) fn parse_base_url(base_url: Option<&str>) -> KgResult<(String, u16)> {
    let base_url = base_url.unwrap_or("http://localhost:11434");
    let url = url::Url::parse(base_url)
        .map_err(|e| KgError::Configuration(format!("Invalid Ollama URL: {}", e)))?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(11434);
    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// An unreachable server aborts the job; anything else is a per-item failure.
#[cfg(feature = "ollama")]
fn map_error<E: std::error::Error + 'static>(e: E) -> KgError {
    if kgrag_core::error::is_transport_failure(&e) {
        KgError::provider_unreachable(format!("Ollama server unreachable: {}", e))
    } else {
        KgError::llm(format!("Ollama API error: {}", e))
    }
}

/// Ollama LLM provider.
pub struct OllamaLlm {
    #[cfg(feature = "ollama")]
    client: Ollama,
    config: LlmConfig,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider.
    pub fn new(config: LlmConfig) -> KgResult<Self> {
        let (host, port) = parse_base_url(config.base_url.as_deref())?;
        tracing::debug!(host = %host, port, "Using Ollama server");

        #[cfg(feature = "ollama")]
        let client = Ollama::new(host, port);

        let mut config = config;
        if config.model.is_empty() {
            config.model = LlmProvider::Ollama.default_model().to_string();
        }

        Ok(Self {
            #[cfg(feature = "ollama")]
            client,
            config,
        })
    }

    #[cfg(feature = "ollama")]
    fn message_to_ollama(msg: &Message) -> ChatMessage {
        match msg.role {
            MessageRole::System => ChatMessage::system(msg.content.clone()),
            MessageRole::User => ChatMessage::user(msg.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(msg.content.clone()),
        }
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    #[cfg(feature = "ollama")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> KgResult<LlmResponse> {
        let options = options.unwrap_or_default();

        let ollama_messages: Vec<ChatMessage> =
            messages.iter().map(Self::message_to_ollama).collect();

        let model_options = OllamaOptions::default()
            .temperature(options.temperature.unwrap_or(self.config.temperature))
            .top_p(options.top_p.unwrap_or(self.config.top_p))
            .num_predict(options.max_tokens.unwrap_or(self.config.max_tokens) as i32);

        let mut request = ChatMessageRequest::new(self.config.model.clone(), ollama_messages)
            .options(model_options);
        if options.wants_json() {
            request = request.format(FormatType::Json);
        }

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(map_error)?;

        let content = response.message.map(|m| m.content);

        Ok(LlmResponse {
            content,
            usage: None,
        })
    }

    #[cfg(not(feature = "ollama"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> KgResult<LlmResponse> {
        Err(KgError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url(None).unwrap(),
            ("http://localhost".to_string(), 11434)
        );
        assert_eq!(
            parse_base_url(Some("https://gpu-box:8080")).unwrap(),
            ("https://gpu-box".to_string(), 8080)
        );
        assert!(parse_base_url(Some("not a url")).is_err());
    }

    #[test]
    fn test_default_model() {
        let llm = OllamaLlm::new(LlmConfig::default()).unwrap();
        assert_eq!(llm.model_name(), "gemma3:12b");
    }

    #[cfg(feature = "ollama")]
    #[tokio::test]
    async fn test_unreachable_server_is_connectivity_error() {
        let llm = OllamaLlm::new(LlmConfig {
            base_url: Some("http://127.0.0.1:1".into()),
            ..Default::default()
        })
        .unwrap();

        let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();
        assert_eq!(err.kind(), kgrag_core::ErrorKind::Connectivity);
    }
}
