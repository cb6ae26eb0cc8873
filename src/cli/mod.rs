//! Command-line interface for docqa.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about a PDF, DOCX or TXT document.
#[derive(Debug, Parser)]
#[command(name = "docqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the browser UI
    Serve(commands::ServeArgs),

    /// Load and chunk a document, reporting the embedding cost
    Ingest(commands::IngestArgs),

    /// Index a document and answer one question about it
    Ask(commands::AskArgs),

    /// Validate an API key with a minimal chat request
    CheckKey(commands::CheckKeyArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
