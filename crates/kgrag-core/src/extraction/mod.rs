//! Type-guided knowledge-graph extraction.
//!
//! # Components
//!
//! - `schema`: allowed node and relationship types
//! - `extractor`: per-type LLM extraction
//! - `normalize`: id normalization, merging and relationship validation
//! - `chunking`: markdown section splitting
//! - `builder`: the full pipeline against a graph store
//! - `indexer`: vector backfill for nodes loaded without one
//!
//! # Example
//!
//! ```ignore
//! use kgrag_core::extraction::{ExtractionSchema, GraphBuilder, GraphExtractor};
//!
//! let extractor = GraphExtractor::new(llm, ExtractionSchema::business());
//! let builder = GraphBuilder::new(extractor, embedder, store);
//! let report = builder.build_from_text("NVIDIA designs the H100.").await?;
//! ```

mod builder;
mod chunking;
mod extractor;
mod indexer;
mod normalize;
mod prompts;
mod schema;

pub use builder::{BuildOptions, BuildReport, GraphBuilder};
pub use chunking::{split_into_sections, Section};
pub use extractor::{truncate_chars, ExtractorConfig, GraphExtractor};
pub use indexer::{IndexReport, VectorIndexer};
pub use normalize::{merge_nodes, normalize_id, validate_relationships, ValidationReport};
pub use prompts::{format_node_list, node_extraction_prompt, relationship_extraction_prompt};
pub use schema::{ExtractionSchema, NodeTypeSpec, RelationshipTypeSpec};
