mod api_client;
mod chat;
mod chunker;
mod cost;
mod embedding;
pub mod ingest;
mod key_check;
mod loader;
pub mod qa;
pub mod vector_store;

pub use api_client::ApiClient;
pub use chat::{ChatClient, ChatMessage, Role};
pub use chunker::TextChunker;
pub use cost::{
    CostEstimator, HeuristicCounter, HfTokenCounter, TiktokenCounter, TokenCounter, estimate_tokens,
};
pub use embedding::EmbeddingClient;
pub use ingest::{PreparedDocument, ingest_document, plan_document, prepare_document};
pub use key_check::{KeyCheckOutcome, check_api_key};
pub use loader::{DocumentFormat, LoadOutcome, load_document, load_document_as};
pub use qa::{ask_and_get_answer, build_stuff_prompt, validate_k};
pub use vector_store::{MemoryIndex, QdrantIndex, VectorStore, create_index};
