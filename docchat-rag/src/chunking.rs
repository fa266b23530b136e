//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text on the most natural boundary available (paragraph, line,
//! sentence, word) and only falls back to cutting between characters when a
//! piece has no boundary at all. All lengths are counted in `char`s.

use std::collections::VecDeque;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators in order of preference. The empty separator splits between
/// characters and always applies.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split every document with `chunker`, preserving document order.
///
/// An empty input yields an empty output; callers that need a corpus treat
/// that as [`RagError::EmptyCorpus`].
pub fn split_documents(documents: &[Document], chunker: &dyn Chunker) -> Vec<Chunk> {
    documents.iter().flat_map(|document| chunker.chunk(document)).collect()
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Separators stay attached to the piece they end and chunks are trimmed,
/// so every chunk is an exact substring of the document. Consecutive chunks share up to `chunk_overlap`
/// characters; when the text has no boundaries at all they share exactly
/// `chunk_overlap`.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::try_new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` without validating its parameters.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Create a new `RecursiveChunker`, rejecting a zero `chunk_size` or an
    /// overlap that is not smaller than the chunk size.
    pub fn try_new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidArgument("chunk_size must be greater than zero".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidArgument(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self::new(chunk_size, chunk_overlap))
    }

    /// Split raw text into chunk strings.
    ///
    /// Chunks are trimmed of surrounding whitespace, and chunks that are only
    /// whitespace are dropped.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        split_recursive(text, &SEPARATORS, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .filter_map(|chunk| {
                let trimmed = chunk.trim();
                if trimmed.is_empty() {
                    None
                } else if trimmed.len() == chunk.len() {
                    Some(chunk)
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect()
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), i.to_string());
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text,
                    document_id: document.id.clone(),
                    source: document.source.clone(),
                    page: document.page,
                    metadata,
                }
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` on the first separator it contains, then merge the pieces
/// into windows. Pieces longer than `chunk_size` are split again with the
/// remaining separators.
fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let position =
        separators.iter().position(|sep| sep.is_empty() || text.contains(sep)).unwrap_or(0);
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let pieces = if separator.is_empty() {
        split_chars(text)
    } else {
        split_keeping_separator(text, separator)
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) <= chunk_size {
            fitting.push(piece);
            continue;
        }

        // Oversized piece: flush what we have, then split it further.
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
            fitting.clear();
        }
        if remaining.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, remaining, chunk_size, chunk_overlap));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, chunk_size, chunk_overlap));
    }

    chunks
}

/// Greedily concatenate pieces into windows of at most `chunk_size` chars,
/// carrying up to `chunk_overlap` trailing chars into the next window.
fn merge_pieces(pieces: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        let len = char_len(piece);

        if total + len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());

            while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                match window.pop_front() {
                    Some((_, front_len)) => total -= front_len,
                    None => break,
                }
            }
        }

        window.push_back((piece, len));
        total += len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().map(|(p, _)| *p).collect::<String>());
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn split_chars(text: &str) -> Vec<&str> {
    text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("doc", "notes.txt", text).with_page(3).with_metadata("lang", "en")
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = RecursiveChunker::new(10, 2);
        assert!(chunker.chunk(&doc("")).is_empty());
        assert!(chunker.chunk(&doc("   \n")).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(100, 10);
        let chunks = chunker.chunk(&doc("A short note."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A short note.");
        assert_eq!(chunks[0].id, "doc_0");
    }

    #[test]
    fn boundary_free_text_overlaps_exactly() {
        let text: String = ('a'..='z').cycle().take(95).collect();
        let chunker = RecursiveChunker::new(20, 5);
        let chunks = chunker.split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            assert_eq!(&prev[prev.len() - 5..], &next[..5]);
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunker = RecursiveChunker::new(30, 0);
        let chunks = chunker.split_text(text);
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn blank_runs_produce_no_whitespace_chunks() {
        let text = format!("Refunds take a week.{}Shipping is free.", "\n".repeat(40));
        let chunker = RecursiveChunker::new(25, 5);
        let chunks = chunker.split_text(&text);

        assert_eq!(chunks, vec!["Refunds take a week.", "Shipping is free."]);
        assert!(chunker.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn falls_back_to_words_before_characters() {
        let text = "alpha beta gamma delta epsilon";
        let chunker = RecursiveChunker::new(12, 0);
        for chunk in chunker.split_text(text) {
            // No word is ever cut in half.
            for word in chunk.split_whitespace() {
                assert!(text.split(' ').any(|w| w == word), "cut word: {word}");
            }
        }
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "日本語のテキスト。".repeat(20);
        let chunker = RecursiveChunker::new(7, 2);
        let chunks = chunker.split_text(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
    }

    #[test]
    fn chunks_inherit_document_metadata() {
        let chunker = RecursiveChunker::new(8, 0);
        let chunks = chunker.chunk(&doc("one two three four"));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.document_id, "doc");
            assert_eq!(chunk.source, "notes.txt");
            assert_eq!(chunk.page, Some(3));
            assert_eq!(chunk.metadata.get("lang").map(String::as_str), Some("en"));
            assert_eq!(chunk.metadata.get("chunk_index"), Some(&i.to_string()));
        }
    }

    #[test]
    fn try_new_rejects_overlap_not_smaller_than_size() {
        assert!(matches!(RecursiveChunker::try_new(10, 10), Err(RagError::InvalidArgument(_))));
        assert!(matches!(RecursiveChunker::try_new(0, 0), Err(RagError::InvalidArgument(_))));
        assert!(RecursiveChunker::try_new(10, 9).is_ok());
    }

    #[test]
    fn split_documents_of_empty_corpus_is_empty() {
        let chunker = RecursiveChunker::new(10, 2);
        assert!(split_documents(&[], &chunker).is_empty());
    }
}
