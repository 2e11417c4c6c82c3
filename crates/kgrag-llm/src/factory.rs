//! Factory for creating LLM providers.

use std::sync::Arc;

use kgrag_core::config::{LlmProvider, LlmProviderConfig};
use kgrag_core::error::KgResult;
use kgrag_core::traits::{Llm, LlmConfig};

use crate::adapter::SystemPromptFolding;
use crate::gemini::GeminiLlm;
use crate::ollama::OllamaLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> KgResult<Arc<dyn Llm>> {
        Self::create_with_folding(provider, config, false)
    }

    /// Create the LLM described by a provider section of the config file.
    pub fn from_config(config: &LlmProviderConfig) -> KgResult<Arc<dyn Llm>> {
        Self::create_with_folding(config.provider, config.config.clone(), config.fold_system_prompt)
    }

    /// Create a provider, wrapping it in [`SystemPromptFolding`] when asked
    /// to or when the model cannot take a system instruction.
    pub fn create_with_folding(
        provider: LlmProvider,
        config: LlmConfig,
        fold_system_prompt: bool,
    ) -> KgResult<Arc<dyn Llm>> {
        match provider {
            LlmProvider::OpenAI => Ok(wrap(OpenAIProvider::new(config)?, fold_system_prompt)),
            LlmProvider::Ollama => Ok(wrap(OllamaLlm::new(config)?, fold_system_prompt)),
            LlmProvider::Gemini => Ok(wrap(GeminiLlm::new(config)?, fold_system_prompt)),
        }
    }

    /// Create an Ollama LLM provider with a specific model.
    pub fn ollama_with_model(model: impl Into<String>) -> KgResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Ollama, config)
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> KgResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }

    /// Create a Gemini LLM provider with a specific model.
    pub fn gemini_with_model(model: impl Into<String>) -> KgResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Gemini, config)
    }
}

fn wrap<L: Llm + 'static>(llm: L, fold: bool) -> Arc<dyn Llm> {
    if fold || !llm.supports_system_instruction() {
        tracing::debug!(model = llm.model_name(), "Folding system prompt into user message");
        Arc::new(SystemPromptFolding::new(llm))
    } else {
        Arc::new(llm)
    }
}
