//! Recursive character text splitter.
//!
//! Splits document text into overlapping windows of at most `chunk_size`
//! characters. Splitting prefers the largest structural boundary present in
//! the text, walking the separator hierarchy paragraph break → line break →
//! space → single character:
//!
//! 1. Pick the first separator that occurs in the text.
//! 2. Split on it, keeping each separator attached to the start of the
//!    piece that follows it.
//! 3. Pieces shorter than `chunk_size` are merged into windows; each new
//!    window starts with the tail of the previous one (up to
//!    `chunk_overlap` characters).
//! 4. Pieces that are still too large are split again with the remaining
//!    separators.
//!
//! All lengths are measured in Unicode scalar values, not bytes. Windows are
//! whitespace-trimmed and empty windows are dropped, so no chunk is empty.

use std::collections::VecDeque;

use thiserror::Error;

/// Separator hierarchy, largest boundary first. `""` means "between characters".
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Invalid chunking parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunk_size must be > 0")]
    ZeroChunkSize,
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Validated `(chunk_size, chunk_overlap)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingParams {
    /// Rejects `chunk_size == 0` and `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

/// Split `text` into ordered, overlapping chunks.
///
/// Text that is shorter than `chunk_size` and carries no surrounding
/// whitespace comes back as a single chunk equal to the input. Empty or
/// whitespace-only text yields no chunks.
pub fn chunk_text(text: &str, params: &ChunkingParams) -> Vec<String> {
    split_recursive(text, &SEPARATORS, params)
}

fn split_recursive(text: &str, separators: &[&str], params: &ChunkingParams) -> Vec<String> {
    let mut separator = separators.last().copied().unwrap_or("");
    let mut remaining: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
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
    let mut small: Vec<&str> = Vec::new();

    for piece in split_keep_start(text, separator) {
        if char_len(piece) < params.chunk_size {
            small.push(piece);
            continue;
        }

        if !small.is_empty() {
            chunks.extend(merge_pieces(&small, params));
            small.clear();
        }

        if remaining.is_empty() {
            // Only reachable with chunk_size == 1: a lone character.
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else {
            chunks.extend(split_recursive(piece, remaining, params));
        }
    }

    if !small.is_empty() {
        chunks.extend(merge_pieces(&small, params));
    }

    chunks
}

/// Split on `separator`, keeping the separator at the start of the next piece.
fn split_keep_start<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Greedily pack pieces into windows of at most `chunk_size` characters,
/// carrying up to `chunk_overlap` characters into the next window.
fn merge_pieces(pieces: &[&str], params: &ChunkingParams) -> Vec<String> {
    let mut windows = Vec::new();
    let mut current: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > params.chunk_size && !current.is_empty() {
            if let Some(window) = join_window(&current) {
                windows.push(window);
            }
            while total > params.chunk_overlap || (total + len > params.chunk_size && total > 0) {
                match current.pop_front() {
                    Some((_, front_len)) => total -= front_len,
                    None => break,
                }
            }
        }

        current.push_back((piece, len));
        total += len;
    }

    if let Some(window) = join_window(&current) {
        windows.push(window);
    }
    windows
}

fn join_window(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(p, _)| *p).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
