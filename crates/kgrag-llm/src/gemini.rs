//! Google Gemini LLM provider (Generative Language REST API).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use kgrag_core::config::LlmProvider;
use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use kgrag_core::types::{Message, MessageRole};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini LLM provider.
pub struct GeminiLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

impl GeminiLlm {
    /// Create a new Gemini LLM provider.
    pub fn new(config: LlmConfig) -> KgResult<Self> {
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
            config.model = LlmProvider::Gemini.default_model().to_string();
        }
        // Accept both "gemini-x" and "models/gemini-x"
        config.model = config.model.trim_start_matches("models/").to_string();

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Gemma models served by this API reject system instructions and JSON mode.
    fn is_gemma(&self) -> bool {
        self.config.model.to_lowercase().starts_with("gemma")
    }

    fn build_request(&self, messages: &[Message], options: &GenerationOptions) -> GenerateContentRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect();

        let contents = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| Content {
                role: Some(
                    match m.role {
                        MessageRole::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();

        let system_instruction = (!system.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: Some(system.join("\n\n")),
            }],
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: options.temperature.unwrap_or(self.config.temperature),
                top_p: options.top_p.unwrap_or(self.config.top_p),
                max_output_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
                response_mime_type: (options.wants_json() && self.supports_json_mode())
                    .then_some("application/json"),
            },
        }
    }
}

/// Map a transport failure to the error taxonomy.
fn request_error(provider: &str, e: reqwest::Error) -> KgError {
    if e.is_connect() || e.is_timeout() {
        KgError::provider_unreachable(format!("{} API unreachable: {}", provider, e))
    } else {
        KgError::llm(format!("{} API request failed: {}", provider, e))
    }
}

/// Map a non-success HTTP response to the error taxonomy.
fn status_error(status: reqwest::StatusCode, body: &str) -> KgError {
    let message = serde_json::from_str::<GeminiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    KgError::from_http_status(status.as_u16(), &format!("Gemini API error ({}): {}", status, message))
}

#[async_trait]
impl Llm for GeminiLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> KgResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = self.build_request(messages, &options);

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.config.model))
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Gemini", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KgError::llm(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let response: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| KgError::llm(format!("Failed to parse response: {}", e)))?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            });

        let usage = response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(LlmResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_system_instruction(&self) -> bool {
        !self.is_gemma()
    }

    fn supports_json_mode(&self) -> bool {
        !self.is_gemma()
    }
}
