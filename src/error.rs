//! Error types for the document question-answering service.

use thiserror::Error;

/// Errors raised while reading an uploaded document.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    PdfError(String),

    #[error("DOCX extraction failed: {0}")]
    DocxError(String),

    #[error("file is not valid UTF-8 text: {0}")]
    EncodingError(String),
}

/// Errors related to chunking parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidOverlap { overlap: usize, size: usize },
}

/// Errors returned by the hosted embedding and chat-completion APIs.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("invalid request (status {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    #[error("request timed out")]
    Timeout,
}

impl LlmError {
    /// Classify a non-success HTTP status the way the hosted API documents it.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => LlmError::Authentication { status, message },
            400 | 404 | 422 => LlmError::InvalidRequest { status, message },
            _ => LlmError::Api { status, message },
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to Qdrant: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised while turning an upload into a vector index.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("document contains no text")]
    NoContent,

    #[error("background task failed: {0}")]
    Task(String),

    #[error("load error: {0}")]
    Load(#[from] LoaderError),

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding error: {0}")]
    Embedding(#[from] LlmError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors raised while answering a question.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("k must be between {min} and {max}, got {value}")]
    InvalidK { value: u32, min: u32, max: u32 },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors related to storing uploaded files.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("no file was uploaded")]
    MissingFile,

    #[error("file is too large: {size} bytes (limit {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("malformed upload: {0}")]
    Multipart(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("{0}")]
    Qa(#[from] QaError),

    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("invalid value for {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_from_status() {
        assert!(matches!(
            LlmError::from_status(401, "bad key".into()),
            LlmError::Authentication { status: 401, .. }
        ));
        assert!(matches!(
            LlmError::from_status(400, "bad body".into()),
            LlmError::InvalidRequest { status: 400, .. }
        ));
        assert!(matches!(
            LlmError::from_status(429, "slow down".into()),
            LlmError::Api { status: 429, .. }
        ));
    }

    #[test]
    fn test_chunk_error_message() {
        let err = ChunkError::InvalidOverlap {
            overlap: 300,
            size: 256,
        };
        assert_eq!(
            err.to_string(),
            "chunk overlap (300) must be smaller than chunk size (256)"
        );
    }
}
