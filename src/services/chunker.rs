//! Text chunking with overlap for embedding.

use std::collections::VecDeque;

use crate::error::ChunkError;
use crate::models::{Chunk, ChunkStrategy, ChunkingConfig, DocumentRecord};

/// Separators tried in order by the recursive strategy.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Text chunker that splits records into overlapping chunks.
///
/// Sizes are measured in characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    strategy: ChunkStrategy,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration.
    pub fn new(config: &ChunkingConfig) -> Result<Self, ChunkError> {
        Self::with_params(config.chunk_size, config.chunk_overlap, config.strategy)
    }

    pub fn with_params(
        chunk_size: usize,
        overlap: usize,
        strategy: ChunkStrategy,
    ) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::InvalidOverlap {
                overlap,
                size: chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            strategy,
        })
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            strategy: config.strategy,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk every record, keeping each record's metadata on its chunks.
    pub fn chunk_all(&self, records: &[DocumentRecord]) -> Vec<Chunk> {
        records.iter().flat_map(|r| self.chunk(r)).collect()
    }

    /// Chunk a single record.
    pub fn chunk(&self, record: &DocumentRecord) -> Vec<Chunk> {
        let content = &record.content;
        if content.trim().is_empty() {
            return Vec::new();
        }

        let pieces = match self.strategy {
            ChunkStrategy::Window => self.split_windows(content),
            ChunkStrategy::Recursive => {
                locate_pieces(content, self.overlap, self.split_recursive(content))
            }
        };

        let total_chunks = pieces.len() as u32;
        pieces
            .into_iter()
            .enumerate()
            .map(|(idx, (text, start, end))| {
                Chunk::from_record(record, text, idx as u32, total_chunks, start, end)
            })
            .collect()
    }

    /// Fixed-size windows advancing by `chunk_size - overlap` characters.
    fn split_windows(&self, content: &str) -> Vec<(String, u64, u64)> {
        let chars: Vec<char> = content.chars().collect();
        let total = chars.len();
        let step = self.chunk_size - self.overlap;
        let mut windows = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            // Blank windows are kept so neighbours keep their exact overlap.
            let text: String = chars[start..end].iter().collect();
            windows.push((text, start as u64, end as u64));
            if end == total {
                break;
            }
            start += step;
        }

        windows
    }

    fn split_recursive(&self, text: &str) -> Vec<String> {
        self.split_with_separators(text, &SEPARATORS)
    }

    fn split_with_separators(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];
        for (i, &sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with_separators(&piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, carrying at most `overlap`
    /// characters of the previous chunk into the next one.
    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                push_trimmed(&mut merged, &current);
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(piece.as_str());
            total += len;
        }

        push_trimmed(&mut merged, &current);
        merged
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(out: &mut Vec<String>, pieces: &VecDeque<&str>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split on `separator`, attaching it to the start of each following piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut parts = text.split(separator);
    let mut pieces: Vec<String> = parts.next().map(str::to_string).into_iter().collect();
    pieces.extend(parts.map(|p| format!("{}{}", separator, p)));
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Forward-only mapping between character and byte positions in a string.
struct CharCursor<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    /// Advance to character `target` and return its byte offset.
    fn seek_char(&mut self, target: usize) -> usize {
        let mut rest = self.text[self.byte..].chars();
        while self.chars < target {
            match rest.next() {
                Some(c) => {
                    self.byte += c.len_utf8();
                    self.chars += 1;
                }
                None => break,
            }
        }
        self.byte
    }

    /// Advance to byte `target` (a char boundary) and return its character offset.
    fn seek_byte(&mut self, target: usize) -> usize {
        if target > self.byte {
            self.chars += self.text[self.byte..target].chars().count();
            self.byte = target;
        }
        self.chars
    }
}

/// Attach character offsets to recursively split pieces by finding each
/// one in the source text, starting where the previous piece's overlap begins.
fn locate_pieces(content: &str, overlap: usize, pieces: Vec<String>) -> Vec<(String, u64, u64)> {
    let mut cursor = CharCursor::new(content);
    let mut search_char = 0usize;
    pieces
        .into_iter()
        .map(|piece| {
            let from = cursor.seek_char(search_char);
            let start = content[from..]
                .find(piece.as_str())
                .map(|pos| cursor.seek_byte(from + pos))
                .unwrap_or(search_char);
            let len = char_len(&piece);
            search_char = start + len.saturating_sub(overlap).max(1);
            (piece, start as u64, (start + len) as u64)
        })
        .collect()
}
