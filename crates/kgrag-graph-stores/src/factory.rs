//! Factory for creating graph store providers.

use std::sync::Arc;

use kgrag_core::error::{KgError, KgResult};
use kgrag_core::traits::{GraphStore, GraphStoreConfig, GraphStoreProvider};

use crate::memory::MemoryGraphStore;

/// Factory for creating graph store providers.
pub struct GraphStoreFactory;

impl GraphStoreFactory {
    /// Create a graph store from the given configuration.
    pub async fn create(config: GraphStoreConfig) -> KgResult<Arc<dyn GraphStore>> {
        match config.provider {
            #[cfg(feature = "neo4j")]
            GraphStoreProvider::Neo4j => {
                let store = crate::neo4j::Neo4jGraphStore::new(config).await?;
                Ok(Arc::new(store))
            }

            GraphStoreProvider::Memory => Ok(Arc::new(MemoryGraphStore::new())),

            #[allow(unreachable_patterns)]
            provider => Err(KgError::UnsupportedProvider {
                provider: provider.to_string(),
            }),
        }
    }

    /// Create a Neo4j graph store.
    #[cfg(feature = "neo4j")]
    pub async fn neo4j(uri: &str, username: &str, password: &str) -> KgResult<Arc<dyn GraphStore>> {
        let config = GraphStoreConfig {
            provider: GraphStoreProvider::Neo4j,
            url: uri.to_string(),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            database: None,
        };
        Self::create(config).await
    }
}
