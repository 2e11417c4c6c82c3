//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{Embedder, EmbeddingAction, GenerationOptions, Llm, LlmResponse};
use kgrag_core::types::Message;

/// Canned reply of the scripted model.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    /// Recoverable provider failure (quota, bad output).
    ProviderError,
    /// Connectivity failure that must abort the job.
    MissingKey,
    /// Provider server not reachable.
    Unreachable,
}

/// LLM that answers by looking for a marker in the last message.
///
/// Rules are tried in order; unmatched node prompts get an empty node list
/// and unmatched relationship prompts an empty relationship list.
#[derive(Default)]
pub struct ScriptedLlm {
    rules: Vec<(String, Reply)>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, marker: &str, reply: &str) -> Self {
        self.rules.push((marker.to_string(), Reply::Text(reply.to_string())));
        self
    }

    pub fn on_reply(mut self, marker: &str, reply: Reply) -> Self {
        self.rules.push((marker.to_string(), reply));
        self
    }

    /// Marker matching the node prompt for one type.
    pub fn node_marker(label: &str) -> String {
        format!("ALL entities of type \"{}\"", label)
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

pub const RELATIONSHIP_MARKER: &str = "You analyze relationships";

#[async_trait]
impl Llm for ScriptedLlm {
    async fn generate(&self, messages: &[Message], _: Option<GenerationOptions>) -> KgResult<LlmResponse> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");

        let reply = self
            .rules
            .iter()
            .find(|(marker, _)| last.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Text(text)) => Ok(LlmResponse::text(text)),
            Some(Reply::ProviderError) => Err(KgError::from_http_status(429, "quota exceeded")),
            Some(Reply::MissingKey) => Err(KgError::missing_credentials("no API key")),
            Some(Reply::Unreachable) => Err(KgError::provider_unreachable("connection refused")),
            None if last.contains(RELATIONSHIP_MARKER) => Ok(LlmResponse::text(r#"{"relationships": []}"#)),
            None => Ok(LlmResponse::text(r#"{"nodes": []}"#)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Deterministic embedder: equal texts give equal vectors.
pub struct HashEmbedder {
    dims: usize,
    /// Texts that get a vector of a different length.
    short: Vec<String>,
    /// Texts whose embedding call fails.
    failing: Vec<String>,
    pub calls: Mutex<Vec<(String, EmbeddingAction)>>,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            short: Vec::new(),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_short(mut self, text: &str) -> Self {
        self.short.push(text.to_string());
        self
    }

    pub fn with_failing(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }

    pub fn vector(text: &str, dims: usize) -> Vec<f32> {
        let mut v = vec![0.1; dims];
        for (i, b) in text.bytes().enumerate() {
            v[(i + b as usize) % dims] += b as f32 / 255.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str, action: Option<EmbeddingAction>) -> KgResult<Vec<f32>> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), action.unwrap_or_default()));

        if self.failing.iter().any(|t| t == text) {
            return Err(KgError::embedding(format!("cannot embed {}", text)));
        }
        let dims = if self.short.iter().any(|t| t == text) {
            self.dims / 2
        } else {
            self.dims
        };
        Ok(Self::vector(text, dims))
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hash"
    }
}
