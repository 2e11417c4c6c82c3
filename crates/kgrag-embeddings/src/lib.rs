//! kgrag-embeddings - Embedding provider implementations for kgrag.
//!
//! # Supported Providers
//!
//! - **Ollama** (feature: `ollama`) - nomic-embed-text and other local models
//! - **OpenAI** (feature: `openai`) - text-embedding-3-small, text-embedding-3-large, etc.
//! - **Gemini** - text-embedding-004 via the Generative Language API
//!
//! # Example
//!
//! ```ignore
//! use kgrag_embeddings::EmbedderFactory;
//!
//! let embedder = EmbedderFactory::ollama_with_model("nomic-embed-text", 768)?;
//! let embedder = EmbedderFactory::gemini_with_model("text-embedding-004", 768)?;
//! ```

mod factory;
mod gemini;
mod ollama;
mod openai;

pub use factory::EmbedderFactory;
pub use gemini::GeminiEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;

// Re-export core types for convenience
pub use kgrag_core::traits::{Embedder, EmbedderConfig, EmbedderProvider, EmbeddingAction};
