mod answer;
mod config;
mod document;

pub use answer::{Answer, ChatHistory, CostEstimate, HistoryEntry, IngestReport, OutputFormat};
pub use config::{
    ChatConfig, ChunkStrategy, ChunkingConfig, Config, CostConfig, DEFAULT_BIND,
    DEFAULT_CHAT_MODEL, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBEDDING_MODEL, DEFAULT_K,
    DEFAULT_LLM_BASE_URL, DEFAULT_PRICE_PER_1K, DEFAULT_UI_CHUNK_SIZE, EmbeddingConfig, LlmConfig,
    MAX_K, MAX_UI_CHUNK_SIZE, MIN_K, MIN_UI_CHUNK_SIZE, RetrievalConfig, ServerConfig,
    SessionConfig, TokenEncoding, UploadConfig, VectorDriver, VectorStoreConfig,
};
pub use document::{Chunk, DocumentRecord, RecordMetadata, ScoredChunk, VectorEntry};
