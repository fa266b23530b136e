//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::index::DEFAULT_EMBED_BATCH_SIZE;

/// How conversation history is folded into a follow-up question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStrategy {
    /// Ask the model to rewrite the follow-up into a standalone question,
    /// then retrieve and answer with that question. History never reaches
    /// the answer prompt, but it does steer retrieval.
    #[default]
    CondenseQuestion,
    /// Retrieve with the raw question and place the history in the answer
    /// prompt. One model call per turn, but retrieval ignores history.
    StuffHistory,
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Sampling temperature passed to the generator.
    pub temperature: f32,
    /// Minimum similarity score for retrieved chunks, if any.
    pub similarity_threshold: Option<f32>,
    /// How history is used for follow-up questions.
    pub strategy: ConversationStrategy,
    /// Keep only the last N turns of history when building prompts.
    /// `None` passes the whole conversation.
    pub max_history_turns: Option<usize>,
    /// Upper bound on a single generation call.
    pub generation_timeout: Duration,
    /// Number of chunks embedded per provider request during index builds.
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            temperature: 0.5,
            similarity_threshold: None,
            strategy: ConversationStrategy::CondenseQuestion,
            max_history_turns: None,
            generation_timeout: Duration::from_secs(60),
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// Configs assembled by hand or deserialized skip the builder, so the
    /// pipeline builder runs this again.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `temperature` is outside `0.0..=2.0`
    /// - `max_history_turns == Some(0)`
    /// - `generation_timeout` or `embed_batch_size` is zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if self.max_history_turns == Some(0) {
            return Err(RagError::ConfigError(
                "max_history_turns must be greater than zero when set".to_string(),
            ));
        }
        if self.generation_timeout.is_zero() {
            return Err(RagError::ConfigError(
                "generation_timeout must be greater than zero".to_string(),
            ));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Drop retrieved chunks scoring below `threshold`.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the conversation strategy.
    pub fn strategy(mut self, strategy: ConversationStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Keep only the last `turns` turns of history in prompts.
    pub fn max_history_turns(mut self, turns: usize) -> Self {
        self.config.max_history_turns = Some(turns);
        self
    }

    /// Set the generation timeout.
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    /// Set the embedding batch size used while building the index.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if [`RagConfig::validate`] fails.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
