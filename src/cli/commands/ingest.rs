use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::chunker_for;
use crate::cli::output::get_formatter;
use crate::models::{ChunkStrategy, Config, OutputFormat};
use crate::services::{CostEstimator, plan_document};
use crate::utils::base_name;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Document to load (.pdf, .docx or .txt)
    pub file: PathBuf,

    #[arg(long, short = 'c', help = "Chunk size in characters")]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "Overlap between consecutive chunks")]
    pub chunk_overlap: Option<usize>,

    #[arg(long, help = "Chunking strategy: window or recursive")]
    pub strategy: Option<ChunkStrategy>,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let chunker = chunker_for(&config, args.chunk_size, args.chunk_overlap, args.strategy)?;
    let estimator = CostEstimator::from_config(&config.cost)?;
    let name = base_name(&args.file.to_string_lossy()).to_string();

    let spinner = (format == OutputFormat::Text).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Loading {}", name));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = plan_document(&args.file, &name, &chunker, &estimator).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let (prepared, report) =
        result.with_context(|| format!("failed to ingest {}", args.file.display()))?;

    print!("{}", formatter.format_ingest_report(&report));

    if verbose && format == OutputFormat::Text {
        for chunk in &prepared.chunks {
            eprintln!(
                "[{}] {} ({} chars)",
                chunk.chunk_index,
                chunk.metadata.location(),
                chunk.content.chars().count()
            );
        }
    }

    Ok(())
}
