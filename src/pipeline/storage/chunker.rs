use std::collections::VecDeque;

use super::types::{Chunker, TextChunk};

/// Separators tried in order: paragraphs, lines, words, then characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Recursive character splitter.
///
/// Text is split on the coarsest separator present; pieces still longer than
/// `chunk_size` are split again with the next separator. Small pieces are then
/// merged back into chunks of at most `chunk_size` characters, carrying up to
/// `overlap` characters of the previous chunk forward. Separators stay attached
/// to the start of the piece that follows them, and every chunk is trimmed.
pub struct RecursiveChunker {
    chunk_size: usize,
    overlap: usize,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = SEPARATORS[SEPARATORS.len() - 1];
        let mut remaining: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge_splits(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge_splits(&good));
        }
        chunks
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &split in splits {
            let len = char_len(split);
            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(doc) = join_trimmed(&current) {
                    docs.push(doc);
                }
                // Drop from the front until what is left fits as overlap.
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            current.push_back(split);
            total += len;
        }

        if let Some(doc) = join_trimmed(&current) {
            docs.push(doc);
        }
        docs
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, SEPARATORS)
            .into_iter()
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .enumerate()
            .map(|(chunk_index, content)| TextChunk {
                content,
                chunk_index,
            })
            .collect()
    }
}

/// Split on `separator`, keeping each separator at the start of the next piece.
/// An empty separator splits into single characters. Empty pieces are dropped.
fn split_keep_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
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
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(parts: &VecDeque<&str>) -> Option<String> {
    let joined: String = parts.iter().copied().collect();
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
