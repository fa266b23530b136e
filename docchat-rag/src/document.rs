//! Data types for documents, chunks, and query results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Origin identifier, typically the path of the file the text came from.
    pub source: String,
    /// 1-based page number for paginated sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no page and empty metadata.
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            page: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A contiguous segment of a [`Document`]'s text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Origin identifier inherited from the parent document.
    pub source: String,
    /// Page number inherited from the parent document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Metadata inherited from the parent document plus `chunk_index`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// The source reference for this chunk.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef { origin: self.source.clone(), page: self.page }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity score (higher is more relevant).
    pub score: f32,
}

/// Where a piece of supporting context came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRef {
    /// Origin identifier of the source document.
    pub origin: String,
    /// Page within the source, if paginated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} (page {page})", self.origin),
            None => f.write_str(&self.origin),
        }
    }
}

/// The outcome of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The generated answer.
    pub answer: String,
    /// One reference per retrieved chunk, in retrieval order.
    pub sources: Vec<SourceRef>,
    /// The question that was embedded for retrieval. Differs from the user's
    /// question when a follow-up was condensed using the conversation history.
    pub standalone_question: String,
}
