//! Upload pipeline: load, chunk, estimate, embed, index.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::error::IngestError;
use crate::models::{Chunk, CostEstimate, IngestReport, VectorEntry};
use crate::services::vector_store::VectorStore;
use crate::services::{CostEstimator, EmbeddingClient, LoadOutcome, TextChunker, load_document_as};

/// A loaded and chunked document, not yet embedded.
#[derive(Debug)]
pub struct PreparedDocument {
    pub filename: String,
    pub records: usize,
    pub chunks: Vec<Chunk>,
}

/// Load `path` (named `display_name` to the user) and split it into chunks.
///
/// Unsupported formats and documents without text stop here, before any
/// embedding request is made.
pub async fn prepare_document(
    path: &Path,
    display_name: &str,
    chunker: &TextChunker,
) -> Result<PreparedDocument, IngestError> {
    let owned_path: PathBuf = path.to_path_buf();
    let owned_name = display_name.to_string();
    let outcome = tokio::task::spawn_blocking(move || load_document_as(&owned_path, &owned_name))
        .await
        .map_err(|e| IngestError::Task(e.to_string()))??;

    let records = match outcome {
        LoadOutcome::Loaded(records) => records,
        LoadOutcome::Unsupported(ext) => return Err(IngestError::UnsupportedFormat(ext)),
    };

    let chunks = chunker.chunk_all(&records);
    if chunks.is_empty() {
        return Err(IngestError::NoContent);
    }

    info!(
        file = display_name,
        records = records.len(),
        chunks = chunks.len(),
        chunk_size = chunker.chunk_size(),
        "document chunked"
    );

    Ok(PreparedDocument {
        filename: display_name.to_string(),
        records: records.len(),
        chunks,
    })
}

/// Embed `chunks` and add them to `index`. Returns the number stored.
pub async fn embed_chunks(
    embedder: &EmbeddingClient,
    chunks: Vec<Chunk>,
    index: &mut dyn VectorStore,
) -> Result<usize, IngestError> {
    if chunks.is_empty() {
        return Ok(0);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let entries: Vec<VectorEntry> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, vector)| VectorEntry { chunk, vector })
        .collect();
    let stored = entries.len();

    index.insert(entries).await?;
    Ok(stored)
}

fn report(
    prepared: &PreparedDocument,
    chunker: &TextChunker,
    cost: CostEstimate,
    embedded: bool,
    started: Instant,
) -> IngestReport {
    IngestReport {
        filename: prepared.filename.clone(),
        records: prepared.records,
        chunk_size: chunker.chunk_size(),
        chunks: prepared.chunks.len(),
        cost,
        embedded,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

/// Chunk and price a document without calling the embedding API.
pub async fn plan_document(
    path: &Path,
    display_name: &str,
    chunker: &TextChunker,
    estimator: &CostEstimator,
) -> Result<(PreparedDocument, IngestReport), IngestError> {
    let started = Instant::now();
    let prepared = prepare_document(path, display_name, chunker).await?;
    let cost = estimator.estimate(&prepared.chunks);
    let report = report(&prepared, chunker, cost, false, started);
    Ok((prepared, report))
}

/// Run the whole upload pipeline into `index`, which should be empty.
pub async fn ingest_document(
    path: &Path,
    display_name: &str,
    chunker: &TextChunker,
    estimator: &CostEstimator,
    embedder: &EmbeddingClient,
    index: &mut dyn VectorStore,
) -> Result<IngestReport, IngestError> {
    let started = Instant::now();
    let prepared = prepare_document(path, display_name, chunker).await?;
    let cost = estimator.estimate(&prepared.chunks);
    info!(file = display_name, "{}", cost.summary());

    let mut report = report(&prepared, chunker, cost, true, started);
    let stored = embed_chunks(embedder, prepared.chunks, index).await?;
    report.duration_ms = started.elapsed().as_millis() as u64;

    info!(
        file = display_name,
        stored,
        backend = %index.backend(),
        duration_ms = report.duration_ms,
        "document indexed"
    );
    Ok(report)
}
