//! Models for ingestion reports, answers and chat history.

use serde::{Deserialize, Serialize};

use super::document::ScoredChunk;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Estimated price of embedding a set of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub total_tokens: usize,
    pub cost_usd: f64,
    pub model: String,
}

impl CostEstimate {
    /// The `Embedding Cost: $0.0000` line shown after an upload.
    pub fn summary(&self) -> String {
        format!("Embedding Cost: ${:.4}", self.cost_usd)
    }
}

/// What happened to an uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub filename: String,
    pub records: usize,
    pub chunk_size: usize,
    pub chunks: usize,
    pub cost: CostEstimate,
    /// `false` for dry runs that stop before the embedding call.
    pub embedded: bool,
    pub duration_ms: u64,
}

impl IngestReport {
    pub fn chunk_summary(&self) -> String {
        format!("Chunk Size: {}, Chunks: {}", self.chunk_size, self.chunks)
    }
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub k: u32,
    pub sources: Vec<ScoredChunk>,
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
}

impl HistoryEntry {
    fn render(&self) -> String {
        format!("Q: {} \nA: {}", self.question, self.answer)
    }
}

const HISTORY_SEPARATOR_WIDTH: usize = 100;

/// Question/answer history, newest entry first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    entries: Vec<HistoryEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exchange in front of every earlier one.
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.insert(
            0,
            HistoryEntry {
                question: question.into(),
                answer: answer.into(),
            },
        );
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render as the text block shown under the answer.
    pub fn render(&self) -> String {
        let separator = "-".repeat(HISTORY_SEPARATOR_WIDTH);
        self.entries
            .iter()
            .map(|entry| format!("{} \n {} \n ", entry.render(), separator))
            .collect()
    }
}
