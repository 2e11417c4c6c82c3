//! kgrag-graph-stores - Graph store implementations for kgrag.
//!
//! # Supported Backends
//!
//! - **Neo4j** (feature: `neo4j`) - Neo4j 5 with native vector indexes
//! - **Memory** - petgraph held in process, for tests and dry runs

pub mod cypher;
mod factory;
mod memory;

#[cfg(feature = "neo4j")]
mod neo4j;

pub use factory::GraphStoreFactory;
pub use memory::MemoryGraphStore;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;

// Re-export core types
pub use kgrag_core::traits::{GraphStore, GraphStoreConfig, GraphStoreProvider};
