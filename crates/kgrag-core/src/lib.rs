//! kgrag-core - Core library for kgrag.
//!
//! This crate provides the core types, provider traits, the type-guided
//! extraction pipeline and graph retrieval for building and querying a
//! knowledge graph with LLM and embedding providers.
//!
//! # Example
//!
//! ```ignore
//! use kgrag_core::extraction::{ExtractionSchema, GraphBuilder, GraphExtractor};
//! use kgrag_core::retrieval::{GraphRag, NeighborhoodRetriever, VectorRetriever};
//!
//! // Build a graph
//! let extractor = GraphExtractor::new(llm.clone(), ExtractionSchema::business());
//! let report = GraphBuilder::new(extractor, embedder.clone(), store.clone())
//!     .build_from_text("Steve Jobs founded Apple in California.")
//!     .await?;
//!
//! // Ask it a question
//! let retriever = NeighborhoodRetriever::new(VectorRetriever::new(store, embedder, "entity_index"));
//! let answer = GraphRag::new(Arc::new(retriever), llm).search("Who founded Apple?", 3, true).await?;
//! ```

pub mod config;
pub mod error;
pub mod extraction;
pub mod json_parser;
pub mod retrieval;
pub mod throttle;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{KgConfig, LlmProvider};
pub use error::{ErrorCode, ErrorKind, KgError, KgResult};
pub use throttle::Throttle;
pub use traits::{
    Embedder, EmbedderConfig, EmbedderProvider, EmbeddingAction, GenerationOptions, GraphStore,
    GraphStoreConfig, GraphStoreProvider, Llm, LlmConfig, LlmResponse, VectorIndexConfig,
};
pub use types::{
    GraphDocument, GraphStats, GraphTriple, Message, MessageRole, Node, PropertyValue,
    RagAnswer, Relationship, RetrievedItem, RetrieverResult, ScoredNode,
};
