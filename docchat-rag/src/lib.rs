//! Retrieval-augmented question answering over a document corpus.
//!
//! This crate provides:
//! - Boundary-preferring document chunking with overlap ([`RecursiveChunker`])
//! - A build-once, read-only vector index with top-k cosine retrieval ([`VectorIndex`])
//! - Durable index storage and the build-once lifecycle ([`IndexStore`], [`KnowledgeBase`])
//! - Per-session conversation memory ([`ConversationMemory`])
//! - A stateless query pipeline with conversational follow-ups ([`RagPipeline`])
//!
//! Embedding and text generation are injected through the
//! [`EmbeddingProvider`] and [`TextGenerator`] traits. Gemini implementations
//! are available with the `gemini` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_rag::*;
//!
//! let documents = load_documents("documents/")?;
//! let chunks = split_documents(&documents, &RecursiveChunker::try_new(1000, 200)?);
//!
//! let mut kb = KnowledgeBase::open(Arc::new(FileIndexStore::new("index/"))).await?;
//! let index = kb.build(&chunks, embedder.as_ref()).await?;
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .generator(generator)
//!     .index(index)
//!     .build()?;
//!
//! let mut memory = ConversationMemory::new();
//! let result = pipeline.ask("What is X?", &mut memory).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod knowledge;
pub mod loader;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod store;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use chunking::{Chunker, RecursiveChunker, split_documents};
pub use config::{ConversationStrategy, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, QueryResult, SearchResult, SourceRef};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::TextGenerator;
pub use index::{IndexEntry, VectorIndex};
pub use knowledge::{IndexState, KnowledgeBase};
pub use loader::{LoadOptions, load_documents, load_documents_with};
pub use memory::{ConversationMemory, Role, Turn};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use store::{FileIndexStore, InMemoryIndexStore, IndexStore};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiGenerator};
