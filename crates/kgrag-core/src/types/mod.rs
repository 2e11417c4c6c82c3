//! Core types for kgrag.

mod graph;
mod message;
mod retrieval;

pub use graph::*;
pub use message::*;
pub use retrieval::*;
