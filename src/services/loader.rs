//! Document loading: extension dispatch to a PDF, DOCX or plain-text reader.

use std::fs;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info};

use crate::error::LoaderError;
use crate::models::{DocumentRecord, RecordMetadata};
use crate::utils::text::normalize_blank_lines;

/// File formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Extensions accepted by the upload form.
    pub const EXTENSIONS: [&'static str; 3] = ["pdf", "docx", "txt"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" => Some(DocumentFormat::Text),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| Self::from_extension(&e.to_string_lossy()))
    }
}

/// Result of a load attempt.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<DocumentRecord>),
    /// The extension (possibly empty) is not one of [`DocumentFormat::EXTENSIONS`].
    Unsupported(String),
}

/// Load a document, naming records after the file itself.
pub fn load_document(path: &Path) -> Result<LoadOutcome, LoaderError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    load_document_as(path, &name)
}

/// Load a document stored at `path` whose user-facing name is `display_name`.
///
/// The format is chosen from the extension of `display_name`, so uploads
/// stored under a generated name still dispatch on what the user sent.
pub fn load_document_as(path: &Path, display_name: &str) -> Result<LoadOutcome, LoaderError> {
    let extension = Path::new(display_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let Some(format) = DocumentFormat::from_extension(&extension) else {
        info!(file = display_name, "document format not supported");
        return Ok(LoadOutcome::Unsupported(extension));
    };

    info!(file = display_name, ?format, "loading document");
    let size_bytes = fs::metadata(path)?.len();
    let metadata = |page: Option<u32>| RecordMetadata {
        source: path.to_string_lossy().to_string(),
        page,
        filename: Some(display_name.to_string()),
        extension: Some(extension.clone()),
        size_bytes,
    };

    let records = match format {
        DocumentFormat::Pdf => read_pdf_pages(path)?
            .into_iter()
            .enumerate()
            .map(|(page, text)| DocumentRecord::new(text, metadata(Some(page as u32))))
            .collect(),
        DocumentFormat::Docx => vec![DocumentRecord::new(read_docx(path)?, metadata(None))],
        DocumentFormat::Text => vec![DocumentRecord::new(read_text(path)?, metadata(None))],
    };

    debug!(records = records.len(), "document loaded");
    Ok(LoadOutcome::Loaded(records))
}

fn read_pdf_pages(path: &Path) -> Result<Vec<String>, LoaderError> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| LoaderError::PdfError(e.to_string()))?;
    Ok(pages.iter().map(|p| normalize_blank_lines(p)).collect())
}

fn read_text(path: &Path) -> Result<String, LoaderError> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| LoaderError::EncodingError(e.to_string()))
}

fn read_docx(path: &Path) -> Result<String, LoaderError> {
    let file = fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| LoaderError::DocxError(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| LoaderError::DocxError(e.to_string()))?
        .read_to_string(&mut xml)?;
    docx_xml_to_text(&xml)
}

/// Extract the visible text of a WordprocessingML body, one line per paragraph.
fn docx_xml_to_text(xml: &str) -> Result<String, LoaderError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| LoaderError::DocxError(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoaderError::DocxError(e.to_string())),
            _ => {}
        }
    }

    Ok(normalize_blank_lines(&text))
}
