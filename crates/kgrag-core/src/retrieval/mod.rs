//! Retrieval over a graph store's vector index, and answering from it.
//!
//! - [`VectorRetriever`]: top-K nodes by vector similarity
//! - [`NeighborhoodRetriever`]: the same hits plus their direct neighbours
//! - [`Text2CypherRetriever`]: the LLM writes a read-only Cypher query
//! - [`GraphRag`]: retrieve, format context, ask the LLM

mod rag;
mod retrievers;
mod text2cypher;

pub use rag::{clean_query, GraphRag, RAG_SYSTEM_PROMPT};
pub use retrievers::{NeighborhoodRetriever, Retriever, VectorRetriever};
pub use text2cypher::{ensure_read_only, extract_cypher, text2cypher_prompt, Text2CypherRetriever};
