//! Vector index abstraction.
//!
//! A session owns at most one index. Each upload builds a fresh one and the
//! previous index is destroyed only once the new one is installed. The Qdrant
//! backend gives every index its own collection.

mod memory;
mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::VectorStoreError;
use crate::models::{ScoredChunk, VectorDriver, VectorEntry, VectorStoreConfig};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add entries. All vectors in one index share a dimension.
    async fn insert(&mut self, entries: Vec<VectorEntry>) -> Result<(), VectorStoreError>;

    /// Return up to `k` chunks ordered by descending similarity.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorStoreError>;

    async fn count(&self) -> Result<u64, VectorStoreError>;

    /// Release backing storage. The index is unusable afterwards.
    async fn destroy(&self) -> Result<(), VectorStoreError>;

    fn backend(&self) -> VectorDriver;
}

/// Create an empty index for one upload of `session_id`.
pub fn create_index(
    config: &VectorStoreConfig,
    session_id: Uuid,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Memory => Ok(Box::new(MemoryIndex::new())),
        VectorDriver::Qdrant => Ok(Box::new(QdrantIndex::new(config, session_id)?)),
    }
}

/// Name of the Qdrant collection that holds one upload of a session.
pub fn collection_name(prefix: &str, session_id: Uuid, index_id: Uuid) -> String {
    format!("{}_{}_{}", prefix, session_id.simple(), index_id.simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name() {
        let id = Uuid::nil();
        assert_eq!(
            collection_name("docqa", id, Uuid::from_u128(u128::MAX)),
            "docqa_00000000000000000000000000000000_ffffffffffffffffffffffffffffffff"
        );
    }

    #[tokio::test]
    async fn test_create_memory_index() {
        let index = create_index(&VectorStoreConfig::default(), Uuid::new_v4()).unwrap();
        assert_eq!(index.backend(), VectorDriver::Memory);
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
