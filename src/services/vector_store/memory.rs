use async_trait::async_trait;
use hnsw_rs::prelude::*;

use super::VectorStore;
use crate::error::VectorStoreError;
use crate::models::{Chunk, ScoredChunk, VectorDriver, VectorEntry};

const MAX_NB_CONNECTION: usize = 16;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
/// Initial capacity hint; the graph grows past it.
const MIN_CAPACITY: usize = 1024;

/// In-process HNSW index over cosine distance.
///
/// Chunks are kept in insertion order and addressed by their HNSW point id.
pub struct MemoryIndex {
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            hnsw: None,
            chunks: Vec::new(),
            dimension: None,
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<(), VectorStoreError> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(VectorStoreError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// Validate a batch before any of it is inserted.
    fn check_batch(&self, entries: &[VectorEntry]) -> Result<(), VectorStoreError> {
        let mut dimension = self.dimension;
        for entry in entries {
            let actual = entry.vector.len();
            if let Some(expected) = dimension
                && expected != actual
            {
                return Err(VectorStoreError::DimensionMismatch { expected, actual });
            }
            if actual == 0 || entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(VectorStoreError::UpsertError(format!(
                    "chunk {} has an empty or non-finite vector",
                    entry.chunk.chunk_index
                )));
            }
            dimension = Some(actual);
        }
        Ok(())
    }
}

/// HNSW cosine distance is `1 - cos`.
fn similarity(distance: f32) -> f32 {
    1.0 - distance
}

#[async_trait]
impl VectorStore for MemoryIndex {
    async fn insert(&mut self, entries: Vec<VectorEntry>) -> Result<(), VectorStoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        self.check_batch(&entries)?;
        self.dimension.get_or_insert(entries[0].vector.len());

        let capacity = (self.chunks.len() + entries.len()).max(MIN_CAPACITY);
        let hnsw = self.hnsw.get_or_insert_with(|| {
            Hnsw::new(
                MAX_NB_CONNECTION,
                capacity,
                MAX_LAYER,
                EF_CONSTRUCTION,
                DistCosine,
            )
        });

        hnsw.set_searching_mode(false);
        for entry in entries {
            let id = self.chunks.len();
            hnsw.insert((&entry.vector, id));
            self.chunks.push(entry.chunk);
        }
        hnsw.set_searching_mode(true);
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        self.check_dimension(query.len())?;
        let Some(hnsw) = self.hnsw.as_ref() else {
            return Ok(Vec::new());
        };
        if k == 0 || query.iter().any(|v| !v.is_finite()) {
            return Ok(Vec::new());
        }

        let ef_search = (k * 2).max(64);
        let mut scored: Vec<ScoredChunk> = hnsw
            .search(query, k, ef_search)
            .into_iter()
            .filter_map(|neighbour| {
                self.chunks.get(neighbour.d_id).map(|chunk| ScoredChunk {
                    chunk: chunk.clone(),
                    score: similarity(neighbour.distance),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64, VectorStoreError> {
        Ok(self.chunks.len() as u64)
    }

    async fn destroy(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    fn backend(&self) -> VectorDriver {
        VectorDriver::Memory
    }
}
