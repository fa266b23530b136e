//! Durable storage for a [`VectorIndex`].
//!
//! The existence of a persisted index is what tells the rest of the system
//! that ingestion has already run; see [`KnowledgeBase`](crate::KnowledgeBase).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::{RagError, Result};
use crate::index::{INDEX_FORMAT_VERSION, VectorIndex};

/// File name of the index snapshot inside a [`FileIndexStore`] directory.
pub const INDEX_FILE_NAME: &str = "index.json";

/// A storage backend that persists and reloads a single [`VectorIndex`].
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{FileIndexStore, IndexStore};
///
/// let store = FileIndexStore::new("index/");
/// if !store.exists().await? {
///     store.save(&index).await?;
/// }
/// let index = store.load().await?;
/// ```
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Whether an index has been persisted.
    async fn exists(&self) -> Result<bool>;

    /// Persist `index`, replacing anything stored before.
    async fn save(&self, index: &VectorIndex) -> Result<()>;

    /// Load the persisted index.
    ///
    /// Returns [`RagError::IndexNotFound`] if nothing has been persisted.
    async fn load(&self) -> Result<VectorIndex>;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// Stores the index as JSON in `<dir>/index.json`.
///
/// Saves write to a temporary file and rename it into place, so a crashed
/// save never leaves behind a half-written index that would later be
/// mistaken for a finished build.
#[derive(Debug, Clone)]
pub struct FileIndexStore {
    dir: PathBuf,
}

impl FileIndexStore {
    /// Create a store rooted at `dir`. Nothing is touched until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the index.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }
}

#[async_trait]
impl IndexStore for FileIndexStore {
    async fn exists(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.index_path()).await?)
    }

    async fn save(&self, index: &VectorIndex) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let bytes = serde_json::to_vec(index)?;
        let tmp = self.dir.join(format!("{INDEX_FILE_NAME}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, self.index_path()).await?;

        info!(
            location = %self.dir.display(),
            entry_count = index.len(),
            bytes = bytes.len(),
            "persisted vector index"
        );
        Ok(())
    }

    async fn load(&self) -> Result<VectorIndex> {
        let path = self.index_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound { location: self.location() });
            }
            Err(e) => return Err(e.into()),
        };

        let index: VectorIndex = serde_json::from_slice(&bytes).map_err(|e| {
            error!(location = %path.display(), error = %e, "failed to decode vector index");
            RagError::VectorStoreError {
                backend: "File".to_string(),
                message: format!("corrupt index at '{}': {e}", path.display()),
            }
        })?;

        if index.version() != INDEX_FORMAT_VERSION {
            return Err(RagError::VectorStoreError {
                backend: "File".to_string(),
                message: format!(
                    "index at '{}' has format version {}, expected {INDEX_FORMAT_VERSION}",
                    path.display(),
                    index.version()
                ),
            });
        }

        debug!(location = %path.display(), entry_count = index.len(), "loaded vector index");
        Ok(index)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// An in-process store, for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryIndexStore {
    index: RwLock<Option<VectorIndex>>,
}

impl InMemoryIndexStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn exists(&self) -> Result<bool> {
        Ok(self.index.read().await.is_some())
    }

    async fn save(&self, index: &VectorIndex) -> Result<()> {
        *self.index.write().await = Some(index.clone());
        Ok(())
    }

    async fn load(&self) -> Result<VectorIndex> {
        self.index
            .read()
            .await
            .clone()
            .ok_or_else(|| RagError::IndexNotFound { location: self.location() })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;
    use crate::index::IndexEntry;

    fn sample_index() -> VectorIndex {
        let chunk = Chunk {
            id: "a_0".into(),
            text: "alpha".into(),
            document_id: "a".into(),
            source: "a.txt".into(),
            page: None,
            metadata: Default::default(),
        };
        VectorIndex::from_entries("test", 2, vec![IndexEntry { chunk, embedding: vec![1.0, 0.0] }])
            .unwrap()
    }

    #[tokio::test]
    async fn file_store_reports_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIndexStore::new(dir.path().join("index"));
        assert!(!store.exists().await.unwrap());
        assert!(matches!(store.load().await, Err(RagError::IndexNotFound { .. })));
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIndexStore::new(dir.path().join("index"));
        let index = sample_index();

        store.save(&index).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(store.load().await.unwrap(), index);
        assert!(!dir.path().join("index").join("index.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE_NAME), b"not json").unwrap();
        let store = FileIndexStore::new(dir.path());
        assert!(matches!(store.load().await, Err(RagError::VectorStoreError { .. })));
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = InMemoryIndexStore::new();
        assert!(matches!(store.load().await, Err(RagError::IndexNotFound { .. })));
        store.save(&sample_index()).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(store.load().await.unwrap().len(), 1);
    }
}
