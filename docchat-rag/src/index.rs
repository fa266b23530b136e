//! Read-only vector index with cosine-similarity retrieval.
//!
//! A [`VectorIndex`] is built once from a set of chunks and an
//! [`EmbeddingProvider`], then only queried. It never computes embeddings on
//! its own: every entry holds the vector the provider returned for its chunk,
//! and the index records which provider that was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Version of the serialized index layout.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Number of chunk texts sent to the provider per request by [`VectorIndex::build`].
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// A chunk stored together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The stored chunk.
    pub chunk: Chunk,
    /// The embedding of `chunk.text`.
    pub embedding: Vec<f32>,
}

/// An immutable collection of [`IndexEntry`]s kept in insertion order.
///
/// Retrieval takes `&self`, so one index can be shared behind an `Arc` by any
/// number of concurrent sessions without locking.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::VectorIndex;
///
/// let index = VectorIndex::build(&chunks, embedder.as_ref()).await?;
/// let hits = index.retrieve(&embedder.embed("question").await?, 4)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    version: u32,
    embedding_model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and store the results, using
    /// [`DEFAULT_EMBED_BATCH_SIZE`] chunks per provider request.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if `chunks` is empty.
    /// - [`RagError::EmbeddingError`] if any embedding request fails or
    ///   returns vectors of the wrong count or length. No partial index is
    ///   ever returned.
    pub async fn build(chunks: &[Chunk], embedder: &dyn EmbeddingProvider) -> Result<Self> {
        Self::build_batched(chunks, embedder, DEFAULT_EMBED_BATCH_SIZE).await
    }

    /// Like [`build`](Self::build) with an explicit batch size.
    pub async fn build_batched(
        chunks: &[Chunk],
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }
        if batch_size == 0 {
            return Err(RagError::InvalidArgument("batch_size must be greater than zero".into()));
        }

        let model = embedder.model().to_string();
        let dimensions = embedder.dimensions();
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            debug!(model = %model, batch_size = texts.len(), "embedding chunk batch");

            let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
                error!(model = %model, error = %e, "embedding failed during index build");
                into_embedding_error(&model, e)
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: model,
                    message: format!(
                        "expected {} embeddings, provider returned {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                if embedding.len() != dimensions {
                    return Err(RagError::EmbeddingError {
                        provider: model,
                        message: format!(
                            "chunk '{}' embedded to {} dimensions, expected {dimensions}",
                            chunk.id,
                            embedding.len()
                        ),
                    });
                }
                entries.push(IndexEntry { chunk: chunk.clone(), embedding });
            }
        }

        info!(model = %model, dimensions, entry_count = entries.len(), "built vector index");

        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            embedding_model: model,
            dimensions,
            built_at: Utc::now(),
            entries,
        })
    }

    /// Assemble an index from entries that were embedded elsewhere.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if `entries` is empty.
    /// - [`RagError::InvalidArgument`] if an embedding does not have `dimensions` values.
    pub fn from_entries(
        embedding_model: impl Into<String>,
        dimensions: usize,
        entries: Vec<IndexEntry>,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(RagError::EmptyCorpus);
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::InvalidArgument(format!(
                "entry '{}' has {} dimensions, expected {dimensions}",
                bad.chunk.id,
                bad.embedding.len()
            )));
        }
        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimensions,
            built_at: Utc::now(),
            entries,
        })
    }

    /// Return the `k` entries most similar to `query_embedding`.
    ///
    /// Results are ordered by descending cosine similarity; equal scores keep
    /// insertion order. Asking for more results than there are entries
    /// returns every entry.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `k` is zero or the query has
    /// a different dimensionality than the index.
    pub fn retrieve(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be greater than zero".into()));
        }
        if query_embedding.len() != self.dimensions {
            return Err(RagError::InvalidArgument(format!(
                "query embedding has {} dimensions, index has {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query_embedding)))
            .collect();

        // `sort_by` is stable, which keeps ties in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    /// Fail with [`RagError::EmbeddingMismatch`] unless `embedder` is the
    /// provider this index was built with.
    pub fn ensure_compatible(&self, embedder: &dyn EmbeddingProvider) -> Result<()> {
        if embedder.model() != self.embedding_model || embedder.dimensions() != self.dimensions {
            return Err(RagError::EmbeddingMismatch {
                expected: format!("{} ({} dims)", self.embedding_model, self.dimensions),
                actual: format!("{} ({} dims)", embedder.model(), embedder.dimensions()),
            });
        }
        Ok(())
    }

    /// Serialized layout version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Identifier of the embedding model used to build the index.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Dimensionality of every stored embedding.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// When the index was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries. Built indexes are never empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn into_embedding_error(model: &str, e: RagError) -> RagError {
    match e {
        e @ RagError::EmbeddingError { .. } => e,
        other => RagError::EmbeddingError { provider: model.to_string(), message: other.to_string() },
    }
}

/// Compute cosine similarity between two vectors.
///
/// Sums are accumulated in `f64` so large finite components cannot overflow.
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    let norm_a = a.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f32
}
