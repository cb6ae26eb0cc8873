use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use super::chunker_for;
use crate::cli::output::{Formatter, TextFormatter, get_formatter};
use crate::models::{Answer, Config, OutputFormat};
use crate::services::{
    ChatClient, CostEstimator, EmbeddingClient, TextChunker, VectorStore, ask_and_get_answer,
    create_index, ingest_document,
};
use crate::utils::base_name;

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Document to answer from (.pdf, .docx or .txt)
    pub file: PathBuf,

    /// Question about the document
    pub question: String,

    #[arg(short = 'k', long, help = "Number of chunks to retrieve")]
    pub k: Option<u32>,

    #[arg(long, short = 'c', help = "Chunk size in characters")]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "Overlap between consecutive chunks")]
    pub chunk_overlap: Option<usize>,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let api_key = config
        .llm
        .api_key
        .clone()
        .context("no API key configured; set OPENAI_API_KEY or llm.api_key")?;

    let chunker = chunker_for(&config, args.chunk_size, args.chunk_overlap, None)?;
    let estimator = CostEstimator::from_config(&config.cost)?;
    let embedder = EmbeddingClient::with_key(&config.llm, &config.embedding, &api_key)?;
    let chat = ChatClient::with_key(&config.llm, &config.chat, &api_key)?;
    let k = args.k.unwrap_or(config.retrieval.k);

    let name = base_name(&args.file.to_string_lossy()).to_string();
    let mut index = create_index(&config.vector_store, Uuid::new_v4())?;

    let outcome = index_and_ask(
        &args,
        &name,
        &chunker,
        &estimator,
        &embedder,
        &chat,
        index.as_mut(),
        k,
        verbose,
    )
    .await;

    if let Err(e) = index.destroy().await {
        tracing::warn!(error = %e, "failed to release index");
    }

    let answer = outcome?;
    print!("{}", formatter.format_answer(&answer));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn index_and_ask(
    args: &AskArgs,
    name: &str,
    chunker: &TextChunker,
    estimator: &CostEstimator,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    index: &mut dyn VectorStore,
    k: u32,
    verbose: bool,
) -> Result<Answer> {
    let report = ingest_document(&args.file, name, chunker, estimator, embedder, index)
        .await
        .with_context(|| format!("failed to index {}", args.file.display()))?;

    if verbose {
        eprint!("{}", TextFormatter.format_ingest_report(&report));
    }

    ask_and_get_answer(&*index, embedder, chat, &args.question, k)
        .await
        .context("failed to answer question")
}
