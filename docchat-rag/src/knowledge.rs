//! Build-once lifecycle of the vector index.
//!
//! A [`KnowledgeBase`] is either [`IndexState::Empty`] or
//! [`IndexState::Built`]. The only transition is `Empty → Built`, taken by
//! [`KnowledgeBase::build`]. Opening a store that already holds an index
//! starts in `Built`, so a later `build` is a no-op and the persisted index
//! is never duplicated. [`KnowledgeBase::rebuild`] is the explicit way to
//! replace it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{DEFAULT_EMBED_BATCH_SIZE, VectorIndex};
use crate::store::IndexStore;

/// Whether an index is available for retrieval.
#[derive(Debug, Clone)]
pub enum IndexState {
    /// Nothing has been built or persisted yet.
    Empty,
    /// A built index, shared read-only.
    Built(Arc<VectorIndex>),
}

impl IndexState {
    /// Whether the state is [`IndexState::Built`].
    pub fn is_built(&self) -> bool {
        matches!(self, IndexState::Built(_))
    }
}

/// Owns the index store and the current [`IndexState`].
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{FileIndexStore, KnowledgeBase};
///
/// let mut kb = KnowledgeBase::open(Arc::new(FileIndexStore::new("index/"))).await?;
/// if !kb.state().is_built() {
///     kb.build(&chunks, embedder.as_ref()).await?;
/// }
/// let index = kb.index()?;
/// ```
pub struct KnowledgeBase {
    store: Arc<dyn IndexStore>,
    state: IndexState,
    batch_size: usize,
}

impl KnowledgeBase {
    /// Open a knowledge base, loading the persisted index if there is one.
    pub async fn open(store: Arc<dyn IndexStore>) -> Result<Self> {
        let state = if store.exists().await? {
            let index = store.load().await?;
            info!(
                location = %store.location(),
                entry_count = index.len(),
                "loaded persisted index; skipping build"
            );
            IndexState::Built(Arc::new(index))
        } else {
            info!(location = %store.location(), "no persisted index found");
            IndexState::Empty
        };

        Ok(Self { store, state, batch_size: DEFAULT_EMBED_BATCH_SIZE })
    }

    /// Set how many chunks are embedded per provider request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// The current state.
    pub fn state(&self) -> &IndexState {
        &self.state
    }

    /// The store backing this knowledge base.
    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// Build and persist the index if none exists yet.
    ///
    /// In [`IndexState::Built`] this returns the existing index and leaves the
    /// store untouched.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if `chunks` is empty; nothing is persisted.
    /// - [`RagError::EmbeddingError`] if any chunk fails to embed; nothing is persisted.
    pub async fn build(
        &mut self,
        chunks: &[Chunk],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Arc<VectorIndex>> {
        if let IndexState::Built(index) = &self.state {
            info!(location = %self.store.location(), "index already built; skipping build");
            return Ok(Arc::clone(index));
        }
        self.build_and_persist(chunks, embedder).await
    }

    /// Build a fresh index and replace whatever is persisted.
    pub async fn rebuild(
        &mut self,
        chunks: &[Chunk],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Arc<VectorIndex>> {
        if self.state.is_built() {
            warn!(location = %self.store.location(), "replacing persisted index");
        }
        self.build_and_persist(chunks, embedder).await
    }

    /// The built index.
    ///
    /// Returns [`RagError::IndexNotFound`] while the state is [`IndexState::Empty`].
    pub fn index(&self) -> Result<Arc<VectorIndex>> {
        match &self.state {
            IndexState::Built(index) => Ok(Arc::clone(index)),
            IndexState::Empty => Err(RagError::IndexNotFound { location: self.store.location() }),
        }
    }

    async fn build_and_persist(
        &mut self,
        chunks: &[Chunk],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Arc<VectorIndex>> {
        let index = VectorIndex::build_batched(chunks, embedder, self.batch_size).await?;
        self.store.save(&index).await?;

        let index = Arc::new(index);
        self.state = IndexState::Built(Arc::clone(&index));
        Ok(index)
    }
}
