//! kgrag-llm - LLM provider implementations for kgrag.
//!
//! # Supported Providers
//!
//! - **Ollama** (feature: `ollama`) - local models such as gemma3
//! - **OpenAI** (feature: `openai`) - GPT-4o and compatible endpoints
//! - **Gemini** - Google Generative Language API over REST
//!
//! # Example
//!
//! ```ignore
//! use kgrag_llm::LlmFactory;
//!
//! let llm = LlmFactory::ollama_with_model("gemma3:12b")?;
//!
//! // Gemma on the Gemini API takes no system instruction; the factory
//! // folds it into the user message automatically.
//! let llm = LlmFactory::gemini_with_model("gemma-3-27b-it")?;
//! ```

mod adapter;
mod factory;
mod gemini;
mod ollama;
mod openai;

pub use adapter::{fold_system_messages, SystemPromptFolding};
pub use factory::LlmFactory;
pub use gemini::GeminiLlm;
pub use ollama::OllamaLlm;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use kgrag_core::config::LlmProvider;
pub use kgrag_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
