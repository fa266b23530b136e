//! Error types for the `docchat-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// There were no documents or chunks to index.
    #[error("Empty corpus: there are no documents to index")]
    EmptyCorpus,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding provider does not match the one the index was built with.
    #[error("Embedding mismatch: index was built with {expected}, provider is {actual}")]
    EmbeddingMismatch {
        /// Model and dimensions recorded in the index.
        expected: String,
        /// Model and dimensions of the configured provider.
        actual: String,
    },

    /// No persisted index exists at the given location.
    #[error("Index not found at {location}")]
    IndexNotFound {
        /// The location that was probed.
        location: String,
    },

    /// A caller supplied an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An error occurred during text generation.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An external call did not complete in time.
    #[error("Timeout: {operation} did not complete within {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The elapsed limit.
        after: Duration,
    },

    /// An error occurred in the index storage backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The storage backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A document could not be loaded from the corpus.
    #[error("Failed to load document {path}: {message}")]
    LoadError {
        /// Path of the offending file.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error while reading documents or index files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An index snapshot could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
