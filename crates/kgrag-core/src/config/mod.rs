//! Configuration system for kgrag.
//!
//! A [`KgConfig`] can be read from a TOML, JSON or YAML file, or assembled
//! from environment variables (call `dotenvy::dotenv()` first to pick up a
//! `.env` file):
//!
//! | variable | field |
//! |---|---|
//! | `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD`, `NEO4J_DATABASE` | `graph_store` |
//! | `GOOGLE_API_KEY`, `OPENAI_API_KEY` | provider API keys |
//! | `OLLAMA_BASE_URL` | Ollama base URL |
//! | `KGRAG_LLM_PROVIDER`, `KGRAG_LLM_MODEL` | `llm` |
//! | `KGRAG_EMBEDDER_PROVIDER`, `KGRAG_EMBEDDER_MODEL`, `KGRAG_EMBEDDING_DIMS` | `embedder` |
//! | `KGRAG_INDEX_NAME` | `index.name` |
//! | `KGRAG_EMBED_DELAY_MS` | `pipeline.embed_delay_ms` |

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{KgError, KgResult};
use crate::extraction::ExtractorConfig;
use crate::traits::{
    EmbedderConfig, EmbedderProvider, GraphStoreConfig, LlmConfig, VectorIndexConfig,
};

/// LLM provider type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProvider {
    OpenAI,
    #[default]
    Ollama,
    Gemini,
}

impl LlmProvider {
    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Ollama => "gemma3:12b",
            Self::Gemini => "gemini-2.5-flash-lite",
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Fold system instructions into the user turn for models that reject them.
    #[serde(default)]
    pub fold_system_prompt: bool,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            fold_system_prompt: false,
            config: LlmConfig {
                model: LlmProvider::Ollama.default_model().to_string(),
                ..Default::default()
            },
        }
    }
}

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

impl Default for EmbedderProviderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::Ollama,
            config: EmbedderConfig::default(),
        }
    }
}

/// Settings of the build pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extraction settings.
    pub extractor: ExtractorConfig,
    /// Fixed pause between sequential embedding calls, in milliseconds.
    pub embed_delay_ms: u64,
    /// Skip document sections shorter than this many characters.
    pub min_section_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            embed_delay_ms: 0,
            min_section_chars: 100,
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KgConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Embedder configuration.
    pub embedder: EmbedderProviderConfig,
    /// Graph store configuration.
    pub graph_store: GraphStoreConfig,
    /// Vector index configuration.
    pub index: VectorIndexConfig,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
}

impl KgConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> KgResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| KgError::Configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| KgError::Configuration(e.to_string()))
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| KgError::Configuration(e.to_string()))
            }
            _ => Err(KgError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> KgResult<Self> {
        Self::default().with_env_overrides(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs; unknown names are ignored.
    pub fn with_env_overrides<I>(mut self, vars: I) -> KgResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();

        // Graph store
        if let Some(uri) = get("NEO4J_URI") {
            self.graph_store.url = uri;
        }
        if let Some(username) = get("NEO4J_USERNAME") {
            self.graph_store.username = Some(username);
        }
        if let Some(password) = get("NEO4J_PASSWORD") {
            self.graph_store.password = Some(password);
        }
        if let Some(database) = get("NEO4J_DATABASE") {
            self.graph_store.database = Some(database);
        }

        // LLM; a provider switch also switches to that provider's model
        if let Some(provider) = get("KGRAG_LLM_PROVIDER") {
            let provider = LlmProvider::from_str(&provider).map_err(|_| {
                KgError::Configuration(format!("Unknown LLM provider: {}", provider))
            })?;
            if provider != self.llm.provider {
                self.llm.provider = provider;
                self.llm.config.model = provider.default_model().to_string();
            }
        }
        if let Some(model) = get("KGRAG_LLM_MODEL") {
            self.llm.config.model = model;
        }

        // Embedder
        if let Some(provider) = get("KGRAG_EMBEDDER_PROVIDER") {
            let provider = EmbedderProvider::from_str(&provider).map_err(|_| {
                KgError::Configuration(format!("Unknown embedder provider: {}", provider))
            })?;
            if provider != self.embedder.provider {
                self.embedder.provider = provider;
                self.embedder.config.model = provider.default_model().to_string();
                self.embedder.config.embedding_dims = provider.default_dimensions();
                self.index.dimensions = provider.default_dimensions();
            }
        }
        if let Some(model) = get("KGRAG_EMBEDDER_MODEL") {
            self.embedder.config.model = model;
        }
        if let Some(dims) = get("KGRAG_EMBEDDING_DIMS") {
            let dims: usize = dims.parse().map_err(|_| {
                KgError::Configuration(format!("KGRAG_EMBEDDING_DIMS is not a number: {}", dims))
            })?;
            self.embedder.config.embedding_dims = dims;
            self.index.dimensions = dims;
        }

        // API keys and base URLs follow the selected providers
        let llm_key = match self.llm.provider {
            LlmProvider::Gemini => get("GOOGLE_API_KEY"),
            LlmProvider::OpenAI => get("OPENAI_API_KEY"),
            LlmProvider::Ollama => None,
        };
        if llm_key.is_some() {
            self.llm.config.api_key = llm_key;
        }
        let embedder_key = match self.embedder.provider {
            EmbedderProvider::Gemini => get("GOOGLE_API_KEY"),
            EmbedderProvider::OpenAI => get("OPENAI_API_KEY"),
            EmbedderProvider::Ollama => None,
        };
        if embedder_key.is_some() {
            self.embedder.config.api_key = embedder_key;
        }
        if let Some(base_url) = get("OLLAMA_BASE_URL") {
            if self.llm.provider == LlmProvider::Ollama {
                self.llm.config.base_url = Some(base_url.clone());
            }
            if self.embedder.provider == EmbedderProvider::Ollama {
                self.embedder.config.base_url = Some(base_url);
            }
        }

        // Index and pipeline
        if let Some(name) = get("KGRAG_INDEX_NAME") {
            self.index.name = name;
        }
        if let Some(delay) = get("KGRAG_EMBED_DELAY_MS") {
            self.pipeline.embed_delay_ms = delay.parse().map_err(|_| {
                KgError::Configuration(format!("KGRAG_EMBED_DELAY_MS is not a number: {}", delay))
            })?;
        }

        Ok(self)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> KgConfigBuilder {
        KgConfigBuilder::default()
    }
}

/// Builder for KgConfig.
#[derive(Default)]
pub struct KgConfigBuilder {
    config: KgConfig,
}

impl KgConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set embedder configuration.
    pub fn embedder(mut self, config: EmbedderProviderConfig) -> Self {
        self.config.embedder = config;
        self
    }

    /// Set graph store configuration.
    pub fn graph_store(mut self, config: GraphStoreConfig) -> Self {
        self.config.graph_store = config;
        self
    }

    /// Set vector index configuration.
    pub fn index(mut self, config: VectorIndexConfig) -> Self {
        self.config.index = config;
        self
    }

    /// Set pipeline configuration.
    pub fn pipeline(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> KgConfig {
        self.config
    }
}
