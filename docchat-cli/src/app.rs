//! Wiring between the command line and the RAG library.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use docchat_rag::{
    EmbeddingProvider, FileIndexStore, GeminiEmbeddingProvider, GeminiGenerator, KnowledgeBase,
    LoadOptions, RagConfig, RagPipeline, RecursiveChunker, TextGenerator, VectorIndex,
    load_documents_with, split_documents,
};
use tracing::info;

use crate::cli::GlobalArgs;

/// What `ingest` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// An index was already persisted and was left as is.
    AlreadyBuilt { entries: usize },
    /// A new index was built and persisted.
    Built { documents: usize, chunks: usize },
}

/// Resolved settings and model providers for one invocation.
pub struct App {
    config: RagConfig,
    docs_dir: PathBuf,
    index_dir: PathBuf,
    load_options: LoadOptions,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
}

impl App {
    /// Build the app with Gemini providers configured from the flags.
    pub fn from_args(args: &GlobalArgs) -> anyhow::Result<Self> {
        let config = args.rag_config()?;
        let api_key = match &args.api_key {
            Some(key) => key.clone(),
            None => docchat_rag::gemini::api_key_from_env()
                .context("set GOOGLE_API_KEY or pass --api-key")?,
        };

        let mut embedder =
            GeminiEmbeddingProvider::new(api_key.clone())?.with_model(&args.embedding_model);
        if let Some(dims) = args.embedding_dimensions {
            embedder = embedder.with_output_dimensionality(dims);
        }
        let generator = GeminiGenerator::new(api_key)?.with_model(&args.model);

        let app = Self::new(
            config,
            args.docs_dir.clone(),
            args.index_dir.clone(),
            Arc::new(embedder),
            Arc::new(generator),
        );
        Ok(app.with_load_options(LoadOptions { recursive: args.recursive }))
    }

    pub fn new(
        config: RagConfig,
        docs_dir: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config,
            docs_dir: docs_dir.into(),
            index_dir: index_dir.into(),
            load_options: LoadOptions::default(),
            embedder,
            generator,
        }
    }

    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Build and persist the index unless one exists. `force` rebuilds it.
    pub async fn ingest(&self, force: bool) -> anyhow::Result<IngestOutcome> {
        let (outcome, _) = self.ensure_index(force).await?;
        Ok(outcome)
    }

    /// A pipeline over the persisted index, building it first if needed.
    pub async fn pipeline(&self) -> anyhow::Result<RagPipeline> {
        let (outcome, index) = self.ensure_index(false).await?;
        if let IngestOutcome::Built { documents, chunks } = outcome {
            info!(documents, chunks, "index was missing and has been built");
        }

        let pipeline = RagPipeline::builder()
            .config(self.config.clone())
            .embedding_provider(Arc::clone(&self.embedder))
            .generator(Arc::clone(&self.generator))
            .index(index)
            .build()
            .context("the persisted index does not match the embedding model; run `docchat ingest --force`")?;
        Ok(pipeline)
    }

    async fn ensure_index(&self, force: bool) -> anyhow::Result<(IngestOutcome, Arc<VectorIndex>)> {
        let mut kb = self.open_knowledge_base().await?;
        if kb.state().is_built() && !force {
            let index = kb.index()?;
            return Ok((IngestOutcome::AlreadyBuilt { entries: index.len() }, index));
        }

        let documents = load_documents_with(&self.docs_dir, &self.load_options)
            .with_context(|| format!("failed to load documents from {}", self.docs_dir.display()))?;
        let chunker = RecursiveChunker::try_new(self.config.chunk_size, self.config.chunk_overlap)?;
        let chunks = split_documents(&documents, &chunker);

        let index = if force {
            kb.rebuild(&chunks, self.embedder.as_ref()).await
        } else {
            kb.build(&chunks, self.embedder.as_ref()).await
        }
        .with_context(|| format!("failed to build the index from {}", self.docs_dir.display()))?;

        info!(
            documents = documents.len(),
            chunks = index.len(),
            index_dir = %self.index_dir.display(),
            "ingest completed"
        );
        Ok((IngestOutcome::Built { documents: documents.len(), chunks: index.len() }, index))
    }

    async fn open_knowledge_base(&self) -> anyhow::Result<KnowledgeBase> {
        let store = Arc::new(FileIndexStore::new(&self.index_dir));
        let kb = KnowledgeBase::open(store)
            .await
            .with_context(|| format!("failed to open the index in {}", self.index_dir.display()))?;
        Ok(kb.with_batch_size(self.config.embed_batch_size))
    }
}
