//! Deterministic test doubles for the embedding and generation seams.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docchat_rag::{Chunk, Document, EmbeddingProvider, RagError, Result, TextGenerator};

/// Embeds text as keyword counts over a fixed vocabulary, so texts sharing
/// vocabulary words end up close together.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    model: String,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self { vocabulary: vocabulary.to_vec(), model: "keyword-v1".into(), calls: AtomicUsize::new(0) }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        Ok(self.vocabulary.iter().map(|word| lower.matches(word).count() as f32).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Returns a pre-assigned vector per exact text.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl TableEmbedder {
    pub fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            table: entries.iter().map(|(t, v)| (t.to_string(), v.clone())).collect(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.table.get(text).cloned().ok_or_else(|| RagError::EmbeddingError {
            provider: "table".into(),
            message: format!("no embedding for '{text}'"),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        "table"
    }
}

/// Fails once it has embedded `fail_after` texts.
pub struct FlakyEmbedder {
    inner: KeywordEmbedder,
    fail_after: usize,
    seen: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(inner: KeywordEmbedder, fail_after: usize) -> Self {
        Self { inner, fail_after, seen: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.seen.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(RagError::EmbeddingError {
                provider: "flaky".into(),
                message: "quota exceeded".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

/// Records every prompt and answers from a script, falling back to a
/// fixed reply.
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
    replies: Mutex<Vec<String>>,
    fallback: String,
}

impl RecordingGenerator {
    pub fn new(fallback: &str) -> Self {
        Self { prompts: Mutex::new(Vec::new()), replies: Mutex::new(Vec::new()), fallback: fallback.into() }
    }

    /// Queue replies returned in order before the fallback is used.
    pub fn with_replies(self, replies: &[&str]) -> Self {
        *self.replies.lock().unwrap() = replies.iter().rev().map(|r| r.to_string()).collect();
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.replies.lock().unwrap().pop().unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> &str {
        "recording"
    }
}

/// Always fails, like an exhausted quota.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        Err(RagError::GenerationError { provider: "failing".into(), message: "quota exceeded".into() })
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Sleeps before answering.
pub struct SlowGenerator(pub Duration);

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".into())
    }

    fn model(&self) -> &str {
        "slow"
    }
}

pub const VOCABULARY: [&str; 6] = ["rust", "python", "cost", "price", "memory", "garden"];

/// A small corpus whose documents each lean on different vocabulary words.
pub fn corpus() -> Vec<Document> {
    vec![
        Document::new("rust", "rust.txt", "Rust is a systems language with memory safety."),
        Document::new("python", "python.txt", "Python is an interpreted language."),
        Document::new("pricing", "pricing.pdf", "The Rust course has a cost of 40 euros. The price includes the book.")
            .with_page(2),
        Document::new("garden", "garden.md", "Tomatoes grow well in a sunny garden."),
    ]
}

pub fn chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.into(),
        text: text.into(),
        document_id: id.into(),
        source: format!("{id}.txt"),
        page: None,
        metadata: Default::default(),
    }
}
