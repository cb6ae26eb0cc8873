//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{VectorStore, collection_name};
use crate::error::VectorStoreError;
use crate::models::{Chunk, RecordMetadata, ScoredChunk, VectorDriver, VectorEntry, VectorStoreConfig};

/// One Qdrant collection per uploaded document.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    /// Set once this index has created its collection.
    initialized: bool,
}

impl QdrantIndex {
    pub fn new(config: &VectorStoreConfig, session_id: Uuid) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection_name(&config.collection_prefix, session_id, Uuid::new_v4()),
            initialized: false,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    /// Start an empty collection, replacing a leftover one with the same name.
    async fn create_collection(&self, dimension: u64) -> Result<(), VectorStoreError> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;
        }

        info!(collection = %self.collection, dimension, "creating collection");
        let create_collection = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }
}

fn chunk_payload(chunk: Chunk) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert("chunk_id".to_string(), chunk.id.into());
    payload.insert("record_id".to_string(), chunk.record_id.into());
    payload.insert("content".to_string(), chunk.content.into());
    payload.insert("chunk_index".to_string(), i64::from(chunk.chunk_index).into());
    payload.insert("total_chunks".to_string(), i64::from(chunk.total_chunks).into());
    payload.insert("start_offset".to_string(), (chunk.start_offset as i64).into());
    payload.insert("end_offset".to_string(), (chunk.end_offset as i64).into());
    payload.insert("source".to_string(), chunk.metadata.source.into());
    payload.insert("size_bytes".to_string(), (chunk.metadata.size_bytes as i64).into());
    if let Some(page) = chunk.metadata.page {
        payload.insert("page".to_string(), i64::from(page).into());
    }
    if let Some(filename) = chunk.metadata.filename {
        payload.insert("filename".to_string(), filename.into());
    }
    if let Some(extension) = chunk.metadata.extension {
        payload.insert("extension".to_string(), extension.into());
    }
    payload
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

fn payload_int(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(n)) => Some(*n),
        _ => None,
    })
}

fn chunk_from_payload(payload: &HashMap<String, Value>) -> Chunk {
    let int = |key: &str| payload_int(payload, key).unwrap_or(0);
    Chunk {
        id: payload_str(payload, "chunk_id").unwrap_or_default(),
        record_id: payload_str(payload, "record_id").unwrap_or_default(),
        content: payload_str(payload, "content").unwrap_or_default(),
        chunk_index: int("chunk_index") as u32,
        total_chunks: int("total_chunks") as u32,
        start_offset: int("start_offset") as u64,
        end_offset: int("end_offset") as u64,
        metadata: RecordMetadata {
            source: payload_str(payload, "source").unwrap_or_default(),
            page: payload_int(payload, "page").map(|p| p as u32),
            filename: payload_str(payload, "filename"),
            extension: payload_str(payload, "extension"),
            size_bytes: int("size_bytes") as u64,
        },
    }
}

#[async_trait]
impl VectorStore for QdrantIndex {
    async fn insert(&mut self, entries: Vec<VectorEntry>) -> Result<(), VectorStoreError> {
        let Some(first) = entries.first() else {
            return Ok(());
        };

        if !self.initialized {
            self.create_collection(first.vector.len() as u64).await?;
            self.initialized = true;
        }

        debug!(collection = %self.collection, points = entries.len(), "upserting points");
        let points: Vec<PointStruct> = entries
            .into_iter()
            .map(|entry| {
                let id = entry.chunk.id.clone();
                PointStruct::new(id, entry.vector, chunk_payload(entry.chunk))
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        if !self.initialized {
            return Ok(Vec::new());
        }

        let search = SearchPointsBuilder::new(&self.collection, query.to_vec(), k as u64)
            .with_payload(true);

        let results = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| ScoredChunk {
                chunk: chunk_from_payload(&point.payload),
                score: point.score,
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, VectorStoreError> {
        if !self.initialized {
            return Ok(0);
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    async fn destroy(&self) -> Result<(), VectorStoreError> {
        if !self.collection_exists().await? {
            return Ok(());
        }

        info!(collection = %self.collection, "deleting collection");
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn backend(&self) -> VectorDriver {
        VectorDriver::Qdrant
    }
}
