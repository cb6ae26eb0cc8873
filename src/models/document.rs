use serde::{Deserialize, Serialize};

/// A page-like unit of text produced by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub content: String,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Path the record was read from.
    pub source: String,
    /// Zero-based page number, for paginated formats.
    pub page: Option<u32>,
    pub filename: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: u64,
}

impl RecordMetadata {
    /// Human-readable location, e.g. `report.pdf (page 3)`.
    pub fn location(&self) -> String {
        let name = self.filename.as_deref().unwrap_or(&self.source);
        match self.page {
            Some(page) => format!("{} (page {})", name, page + 1),
            None => name.to_string(),
        }
    }
}

/// A bounded slice of a record, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub record_id: String,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Offsets in characters within the parent record.
    pub start_offset: u64,
    pub end_offset: u64,
    pub metadata: RecordMetadata,
}

/// A chunk together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl DocumentRecord {
    pub fn generate_id(source: &str, page: Option<u32>) -> String {
        use sha2::{Digest, Sha256};
        let input = match page {
            Some(page) => format!("{}#{}", source, page),
            None => source.to_string(),
        };
        let hash = Sha256::digest(input.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(content: String, metadata: RecordMetadata) -> Self {
        let id = Self::generate_id(&metadata.source, metadata.page);
        Self {
            id,
            content,
            metadata,
        }
    }
}

impl Chunk {
    pub fn generate_id(record_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", record_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_record(
        record: &DocumentRecord,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        Self {
            id: Self::generate_id(&record.id, chunk_index),
            record_id: record.id.clone(),
            content,
            chunk_index,
            total_chunks,
            start_offset,
            end_offset,
            metadata: record.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_depends_on_page() {
        let a = DocumentRecord::generate_id("/tmp/a.pdf", Some(0));
        let b = DocumentRecord::generate_id("/tmp/a.pdf", Some(1));
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_chunk_generate_id() {
        let id = Chunk::generate_id("abc123", 5);
        assert_eq!(id.len(), 36);
        assert_eq!(id, Chunk::generate_id("abc123", 5));
        assert_ne!(id, Chunk::generate_id("abc123", 6));
    }

    #[test]
    fn test_location() {
        let mut meta = RecordMetadata {
            source: "/uploads/x/report.pdf".to_string(),
            filename: Some("report.pdf".to_string()),
            page: Some(2),
            ..Default::default()
        };
        assert_eq!(meta.location(), "report.pdf (page 3)");
        meta.page = None;
        assert_eq!(meta.location(), "report.pdf");
    }
}
