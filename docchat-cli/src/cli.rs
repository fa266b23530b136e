//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docchat_rag::{ConversationStrategy, RagConfig};
use docchat_telemetry::LogFormat;

/// Chat with a folder of documents.
#[derive(Debug, Parser)]
#[command(name = "docchat", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Directory holding the persisted index
    #[arg(long, global = true, env = "DOCCHAT_INDEX_DIR", default_value = "index")]
    pub index_dir: PathBuf,

    /// Directory holding the source documents
    #[arg(long, global = true, env = "DOCCHAT_DOCS_DIR", default_value = "documents")]
    pub docs_dir: PathBuf,

    /// Descend into subdirectories of the documents directory
    #[arg(long, global = true)]
    pub recursive: bool,

    /// Gemini API key
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Embedding model
    #[arg(long, global = true, env = "DOCCHAT_EMBEDDING_MODEL", default_value = "gemini-embedding-001")]
    pub embedding_model: String,

    /// Truncate embeddings to this many dimensions
    #[arg(long, global = true)]
    pub embedding_dimensions: Option<usize>,

    /// Generation model
    #[arg(long, global = true, env = "DOCCHAT_MODEL", default_value = "gemini-2.5-flash")]
    pub model: String,

    /// Sampling temperature
    #[arg(long, global = true, default_value_t = 0.5)]
    pub temperature: f32,

    /// Maximum chunk size in characters
    #[arg(long, global = true, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, global = true, default_value_t = 4)]
    pub top_k: usize,

    /// Drop retrieved chunks scoring below this similarity
    #[arg(long, global = true)]
    pub min_score: Option<f32>,

    /// How follow-up questions use the conversation
    #[arg(long, global = true, value_enum, default_value_t = StrategyArg::Condense)]
    pub strategy: StrategyArg,

    /// Only send the last N turns of the conversation to the model
    #[arg(long, global = true)]
    pub history_turns: Option<usize>,

    /// Seconds to wait for a model answer
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Print how long each query stage took
    #[arg(long, global = true)]
    pub timings: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the index from the documents directory
    Ingest {
        /// Rebuild even if an index already exists
        #[arg(long)]
        force: bool,
    },
    /// Answer a single question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Start an interactive conversation
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Rewrite follow-ups into standalone questions before retrieval
    Condense,
    /// Pass the conversation to the answer prompt
    Stuff,
}

impl From<StrategyArg> for ConversationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Condense => ConversationStrategy::CondenseQuestion,
            StrategyArg::Stuff => ConversationStrategy::StuffHistory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl GlobalArgs {
    /// Validated pipeline configuration from the flags.
    pub fn rag_config(&self) -> docchat_rag::Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .temperature(self.temperature)
            .strategy(self.strategy.into())
            .generation_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(threshold) = self.min_score {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(turns) = self.history_turns {
            builder = builder.max_history_turns(turns);
        }
        builder.build()
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ingest { .. } => "ingest",
            Command::Ask { .. } => "ask",
            Command::Chat => "chat",
        }
    }
}
