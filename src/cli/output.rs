use std::fmt::Write as FmtWrite;

use crate::models::{Answer, IngestReport, OutputFormat};
use crate::services::KeyCheckOutcome;
use crate::utils::preview;

const SOURCE_PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_ingest_report(&self, report: &IngestReport) -> String;
    fn format_answer(&self, answer: &Answer) -> String;
    fn format_key_check(&self, outcome: &KeyCheckOutcome) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_ingest_report(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        writeln!(output, "{}", report.filename).unwrap();
        writeln!(output, "{}", report.chunk_summary()).unwrap();
        writeln!(output, "{}", report.cost.summary()).unwrap();
        writeln!(
            output,
            "Records: {}, Tokens: {} ({})",
            report.records, report.cost.total_tokens, report.cost.model
        )
        .unwrap();
        if report.embedded {
            writeln!(output, "Embedded in {}ms", report.duration_ms).unwrap();
        }
        output
    }

    fn format_answer(&self, answer: &Answer) -> String {
        let mut output = String::new();
        writeln!(output, "Q: {}", answer.question).unwrap();
        writeln!(output, "A: {}", answer.text).unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Sources (k={}):", answer.k).unwrap();

        for (i, source) in answer.sources.iter().enumerate() {
            writeln!(
                output,
                "{}. [Score: {:.3}] {}",
                i + 1,
                source.score,
                source.chunk.metadata.location()
            )
            .unwrap();
            for line in preview(&source.chunk.content, SOURCE_PREVIEW_CHARS).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
        }
        output
    }

    fn format_key_check(&self, outcome: &KeyCheckOutcome) -> String {
        format!("{}\n", outcome.message())
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)) + "\n"
    }
}

impl Formatter for JsonFormatter {
    fn format_ingest_report(&self, report: &IngestReport) -> String {
        self.render(&serde_json::json!(report))
    }

    fn format_answer(&self, answer: &Answer) -> String {
        let sources: Vec<serde_json::Value> = answer
            .sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "score": s.score,
                    "location": s.chunk.metadata.location(),
                    "chunk_index": s.chunk.chunk_index,
                    "content": s.chunk.content,
                })
            })
            .collect();

        self.render(&serde_json::json!({
            "question": answer.question,
            "answer": answer.text,
            "k": answer.k,
            "sources": sources,
        }))
    }

    fn format_key_check(&self, outcome: &KeyCheckOutcome) -> String {
        self.render(&serde_json::json!({
            "valid": outcome.is_valid(),
            "outcome": outcome,
            "message": outcome.message(),
        }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string() + "\n"
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string() + "\n"
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
