//! Text chunking with structure awareness
//!
//! Documents are split into overlapping chunks that:
//! - Respect heading boundaries when possible
//! - Never break inside a fenced code block when a better break exists
//! - Are deterministic, so unchanged text yields unchanged hashes

mod boundaries;

pub use boundaries::*;

use crate::config::ChunkConfig;
use crate::parse::{Heading, ParsedDocument};
use blake3::Hasher;
use std::ops::Range;

/// One retrievable slice of a document
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub text: String,
    /// Byte span in the extracted text (before trimming)
    pub span: Range<usize>,
    /// Position within the document, counting from 0
    pub index: usize,
    /// Enclosing section titles, outermost first
    pub headings: Vec<String>,
    /// Blake3 of the owning document id and the chunk text
    pub hash: String,
}

/// Hash chunk text within a scope so identical passages in two documents stay distinct
pub fn chunk_hash(text: &str, scope: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(scope.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Chunk a parsed document; `scope` (usually the document id) seeds every chunk hash
pub fn chunk_document(doc: &ParsedDocument, scope: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let text = &doc.text;

    if text.is_empty() {
        return Vec::new();
    }

    let break_points = find_break_points(text, &doc.headings, config);

    let mut chunks = Vec::new();
    let mut current_start = 0;
    let mut chunk_index = 0;

    while current_start < text.len() {
        current_start = ensure_char_boundary(text, current_start);
        if current_start >= text.len() {
            break;
        }

        let target_end = current_start + config.max_chars;

        let chunk_end = if target_end >= text.len() {
            text.len()
        } else {
            find_best_break(text, current_start, target_end, &break_points, config)
        };

        let chunk_end = ensure_char_boundary(text, chunk_end);
        if chunk_end <= current_start {
            // No progress possible at this boundary; step past the next char
            current_start = next_char_boundary(text, current_start);
            continue;
        }

        let chunk_text = text[current_start..chunk_end].trim().to_string();

        // Skip if too small (unless it's the last chunk)
        if chunk_text.len() < config.min_chars && chunk_end < text.len() {
            current_start = chunk_end;
            continue;
        }

        if !chunk_text.is_empty() {
            let headings = doc.heading_trail(current_start);

            let hash = chunk_hash(&chunk_text, scope);

            chunks.push(TextChunk {
                text: chunk_text,
                span: current_start..chunk_end,
                index: chunk_index,
                headings,
                hash,
            });

            chunk_index += 1;
        }

        if chunk_end >= text.len() {
            break;
        }

        // Move to next chunk with overlap, always making forward progress
        let overlapped = if chunk_end > config.overlap_chars {
            ensure_char_boundary(text, chunk_end - config.overlap_chars)
        } else {
            chunk_end
        };
        current_start = if overlapped > current_start {
            overlapped
        } else {
            chunk_end
        };
    }

    chunks
}

/// Every allowed split position, sorted, strongest kind kept per offset
fn find_break_points(text: &str, headings: &[Heading], config: &ChunkConfig) -> Vec<BreakPoint> {
    let fences = CodeFences::scan(text);

    let heading_breaks = headings
        .iter()
        .filter(|_| config.prefer_heading_boundaries)
        .map(|h| (h.position, BreakKind::Heading));
    let paragraph_breaks = text
        .match_indices("\n\n")
        .map(|(i, _)| (i + 2, BreakKind::Paragraph));
    let sentence_breaks = [". ", ".\n", "? ", "! "]
        .into_iter()
        .flat_map(|pattern| text.match_indices(pattern))
        .map(|(i, _)| (i + 2, BreakKind::Sentence));

    let mut points: Vec<BreakPoint> = heading_breaks
        .chain(paragraph_breaks)
        .chain(sentence_breaks)
        .filter(|&(pos, _)| pos < text.len() && text.is_char_boundary(pos) && !fences.contains(pos))
        .map(|(position, kind)| BreakPoint { position, kind })
        .collect();

    points.sort_by_key(|p| (p.position, std::cmp::Reverse(p.kind)));
    points.dedup_by_key(|p| p.position);
    points
}

/// Ensure a position is on a valid UTF-8 character boundary
fn ensure_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut adjusted = pos;
    while adjusted > 0 && !text.is_char_boundary(adjusted) {
        adjusted -= 1;
    }
    adjusted
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    let mut next = pos + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next.min(text.len())
}

/// Find the best break point near the target position
fn find_best_break(
    text: &str,
    start: usize,
    target: usize,
    break_points: &[BreakPoint],
    config: &ChunkConfig,
) -> usize {
    // Search window: 80% to 100% of target chunk size
    let min_pos = ensure_char_boundary(text, start + (config.max_chars * 4 / 5));
    let max_pos = ensure_char_boundary(text, std::cmp::min(target, text.len()));

    // Strongest kind wins; among equals, the latest position
    if let Some(best) = break_points
        .iter()
        .filter(|p| p.position >= min_pos && p.position <= max_pos)
        .max_by_key(|p| (p.kind, p.position))
    {
        return best.position;
    }

    // Fall back to the last word boundary inside the window
    if min_pos < max_pos {
        if let Some(i) = text[min_pos..max_pos].rfind(' ') {
            return min_pos + i + 1;
        }
    }

    max_pos
}

/// Blake3 hex digest of raw file bytes
pub fn compute_content_hash(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}
