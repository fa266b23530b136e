//! Ingest and query wiring against a temporary documents directory.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use docchat_cli::{App, IngestOutcome};
use docchat_rag::{ConversationMemory, EmbeddingProvider, RagConfig, RagError, TextGenerator};
use tempfile::TempDir;

const WORDS: [&str; 4] = ["invoice", "refund", "shipping", "warranty"];

struct WordEmbedder;

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    async fn embed(&self, text: &str) -> docchat_rag::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(WORDS.iter().map(|w| lower.matches(w).count() as f32).collect())
    }

    fn dimensions(&self) -> usize {
        WORDS.len()
    }

    fn model(&self) -> &str {
        "word-counts"
    }
}

struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str, _temperature: f32) -> docchat_rag::Result<String> {
        let question = prompt.rsplit("Question: ").next().unwrap_or_default();
        Ok(format!("echo: {}", question.trim_end_matches("\nAnswer:")))
    }

    fn model(&self) -> &str {
        "echo"
    }
}

struct Workspace {
    docs: TempDir,
    index: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let docs = tempfile::tempdir().unwrap();
        fs::write(docs.path().join("refunds.txt"), "A refund is issued within 14 days.").unwrap();
        fs::write(docs.path().join("shipping.md"), "# Shipping\nShipping takes 3 days.").unwrap();
        Self { docs, index: tempfile::tempdir().unwrap() }
    }

    fn app(&self) -> App {
        let config = RagConfig::builder().chunk_size(200).chunk_overlap(20).top_k(1).build().unwrap();
        App::new(config, self.docs.path(), self.index.path(), Arc::new(WordEmbedder), Arc::new(EchoGenerator))
    }
}

#[tokio::test]
async fn ingest_builds_once_and_force_rebuilds() {
    let workspace = Workspace::new();
    let app = workspace.app();

    assert_eq!(app.ingest(false).await.unwrap(), IngestOutcome::Built { documents: 2, chunks: 2 });
    assert!(workspace.index.path().join("index.json").exists());

    assert_eq!(app.ingest(false).await.unwrap(), IngestOutcome::AlreadyBuilt { entries: 2 });

    fs::write(workspace.docs.path().join("warranty.txt"), "The warranty lasts two years.").unwrap();
    assert_eq!(app.ingest(false).await.unwrap(), IngestOutcome::AlreadyBuilt { entries: 2 });
    assert_eq!(app.ingest(true).await.unwrap(), IngestOutcome::Built { documents: 3, chunks: 3 });
}

#[tokio::test]
async fn pipeline_builds_a_missing_index_before_answering() {
    let workspace = Workspace::new();
    let pipeline = workspace.app().pipeline().await.unwrap();

    let mut memory = ConversationMemory::new();
    let result = pipeline.ask("How long does a refund take?", &mut memory).await.unwrap();

    assert_eq!(result.answer, "echo: How long does a refund take?");
    assert_eq!(result.sources[0].origin, "refunds.txt");
    assert_eq!(memory.len(), 2);
}

#[tokio::test]
async fn empty_documents_directory_persists_nothing() {
    let docs = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    let app = App::new(
        RagConfig::default(),
        docs.path(),
        index.path(),
        Arc::new(WordEmbedder),
        Arc::new(EchoGenerator),
    );

    let error = app.ingest(false).await.unwrap_err();

    assert!(matches!(error.downcast_ref::<RagError>(), Some(RagError::EmptyCorpus)));
    assert!(!index.path().join("index.json").exists());
}
