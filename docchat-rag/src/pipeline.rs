//! Question-answering pipeline.
//!
//! The [`RagPipeline`] answers a question in strictly sequential steps:
//! (condense follow-up →) embed → retrieve → assemble prompt → generate.
//! It holds no conversation state; history is passed into every call, so one
//! pipeline can serve any number of sessions concurrently.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::{ConversationMemory, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .generator(generator)
//!     .index(knowledge_base.index()?)
//!     .build()?;
//!
//! let mut memory = ConversationMemory::new();
//! let result = pipeline.ask("What is X?", &mut memory).await?;
//! println!("{}", result.answer);
//! ```

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span};

use crate::config::{ConversationStrategy, RagConfig};
use crate::document::{QueryResult, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::index::{VectorIndex, into_embedding_error};
use crate::memory::{ConversationMemory, Turn};
use crate::prompt;

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. All collaborators are
/// injected; nothing is looked up from global state.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
    index: Arc<VectorIndex>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the generator.
    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Return a reference to the index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Embed `question` and return the `top_k` most similar chunks.
    ///
    /// Chunks scoring below the configured similarity threshold are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the question cannot be embedded.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self
            .embedding_provider
            .embed(question)
            .instrument(info_span!("rag.embed", text_len = question.len()))
            .await
            .map_err(|e| {
                error!(error = %e, "embedding failed during query");
                into_embedding_error(self.embedding_provider.model(), e)
            })?;

        let top_k = self.config.top_k;
        let results = info_span!("rag.retrieve", top_k)
            .in_scope(|| self.index.retrieve(&query_embedding, top_k))?;

        Ok(match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        })
    }

    /// Answer `question` given the prior turns of the conversation.
    ///
    /// Pass an empty `history` for stateless question answering.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for a blank question.
    /// - [`RagError::EmbeddingError`] if the question cannot be embedded.
    /// - [`RagError::GenerationError`] if the model fails or answers with nothing.
    /// - [`RagError::Timeout`] if a model call exceeds the configured timeout.
    pub async fn answer(&self, question: &str, history: &[Turn]) -> Result<QueryResult> {
        let span = info_span!(
            "rag.answer",
            session.id = tracing::field::Empty,
            history_turns = history.len()
        );
        self.run(question, history).instrument(span).await
    }

    /// Answer `question` within a session and record the exchange.
    ///
    /// The question and answer are appended to `memory` only when answering
    /// succeeds, so every stored turn has a real answer.
    pub async fn ask(&self, question: &str, memory: &mut ConversationMemory) -> Result<QueryResult> {
        let span = info_span!(
            "rag.answer",
            session.id = %memory.session_id(),
            history_turns = memory.len()
        );
        let result = self.run(question, memory.history()).instrument(span).await?;
        memory.record_exchange(question.trim(), result.answer.clone());
        Ok(result)
    }

    async fn run(&self, question: &str, history: &[Turn]) -> Result<QueryResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidArgument("question must not be empty".into()));
        }

        let history = prompt::window(history, self.config.max_history_turns);

        // 1. Fold history into the question used for retrieval
        let standalone_question = match self.config.strategy {
            ConversationStrategy::CondenseQuestion if !history.is_empty() => {
                let condensed = self
                    .generate(&prompt::condense_prompt(history, question), "condense")
                    .instrument(info_span!("rag.condense", history_turns = history.len()))
                    .await?;
                let condensed = condensed.trim();
                if condensed.is_empty() { question.to_string() } else { condensed.to_string() }
            }
            _ => question.to_string(),
        };

        // 2. Embed and retrieve
        let results = self.retrieve(&standalone_question).await?;

        // 3. Assemble the answer prompt
        let prompt_history: &[Turn] = match self.config.strategy {
            ConversationStrategy::StuffHistory => history,
            ConversationStrategy::CondenseQuestion => &[],
        };
        let prompt = prompt::answer_prompt(&standalone_question, &results, prompt_history);

        // 4. Generate
        let answer = self
            .generate(&prompt, "answer")
            .instrument(info_span!("rag.generate", prompt_len = prompt.len()))
            .await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(RagError::GenerationError {
                provider: self.generator.model().to_string(),
                message: "model returned an empty answer".into(),
            });
        }

        let sources = results.iter().map(|r| r.chunk.source_ref()).collect();
        info!(result_count = results.len(), "query completed");

        Ok(QueryResult { answer: answer.to_string(), sources, standalone_question })
    }

    async fn generate(&self, prompt: &str, operation: &str) -> Result<String> {
        let timeout = self.config.generation_timeout;
        let call = self.generator.generate(prompt, self.config.temperature);

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                error!(operation, error = %e, "generation failed");
                Err(match e {
                    e @ (RagError::GenerationError { .. } | RagError::Timeout { .. }) => e,
                    other => RagError::GenerationError {
                        provider: self.generator.model().to_string(),
                        message: other.to_string(),
                    },
                })
            }
            Err(_) => {
                error!(operation, ?timeout, "generation timed out");
                Err(RagError::Timeout { operation: format!("{operation} generation"), after: timeout })
            }
        }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields are required. Call [`build()`](RagPipelineBuilder::build)
/// to validate and produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn TextGenerator>>,
    index: Option<Arc<VectorIndex>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider. It must be the one the index was built with.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the text generator.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the index to retrieve from.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if any required field is missing or the
    ///   config is invalid.
    /// - [`RagError::EmbeddingMismatch`] if the embedding provider differs
    ///   from the one the index was built with.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;

        index.ensure_compatible(embedding_provider.as_ref())?;

        Ok(RagPipeline { config, embedding_provider, generator, index })
    }
}
