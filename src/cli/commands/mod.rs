mod ask;
mod check_key;
mod config;
mod ingest;
mod serve;

pub use ask::AskArgs;
pub use check_key::CheckKeyArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use serve::ServeArgs;

pub use ask::handle_ask;
pub use check_key::handle_check_key;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use serve::handle_serve;

use anyhow::Result;

use crate::models::{ChunkStrategy, Config};
use crate::services::TextChunker;

/// Build a chunker from config, with per-invocation overrides.
fn chunker_for(
    config: &Config,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    strategy: Option<ChunkStrategy>,
) -> Result<TextChunker> {
    let chunking = &config.chunking;
    Ok(TextChunker::with_params(
        chunk_size.unwrap_or(chunking.chunk_size),
        chunk_overlap.unwrap_or(chunking.chunk_overlap),
        strategy.unwrap_or(chunking.strategy),
    )?)
}
