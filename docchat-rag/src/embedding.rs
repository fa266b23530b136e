//! The seam between the index and whatever model turns text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// The same provider (same model, same dimensions) must be used to build an
/// index and to embed the questions asked against it. [`VectorIndex`] records
/// [`model`](EmbeddingProvider::model) and
/// [`dimensions`](EmbeddingProvider::dimensions) so a mismatch is caught when
/// a pipeline is assembled instead of silently degrading retrieval.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// [`VectorIndex`]: crate::index::VectorIndex
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::EmbeddingProvider;
///
/// let vector = embedder.embed("What is covered by the warranty?").await?;
/// assert_eq!(vector.len(), embedder.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per text in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for &text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Return an identifier of the embedding model, e.g. `gemini-embedding-001`.
    fn model(&self) -> &str;
}
