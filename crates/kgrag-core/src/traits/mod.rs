//! Core traits for kgrag providers.

mod embedder;
mod graph_store;
mod llm;

pub use embedder::*;
pub use graph_store::*;
pub use llm::*;
