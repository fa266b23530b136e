//! # Offline RAG Example
//!
//! Builds an index from a few in-memory documents, persists it to a temporary
//! directory, and holds a short conversation with it, including a follow-up
//! question that only makes sense with the history.
//!
//! Uses a keyword-count embedder and a generator that quotes its best context
//! chunk, so it runs with **zero API keys**.
//!
//! Run: `cargo run -p docchat-demos --example rag_offline`

use std::sync::Arc;

use docchat_rag::prompt::CONDENSE_INSTRUCTION;
use docchat_rag::{
    ConversationMemory, Document, EmbeddingProvider, FileIndexStore, KnowledgeBase, RagConfig,
    RagPipeline, RecursiveChunker, TextGenerator, split_documents,
};

// ---------------------------------------------------------------------------
// KeywordEmbedder: one dimension per keyword, valued by occurrence count
// ---------------------------------------------------------------------------

const KEYWORDS: [&str; 8] =
    ["rust", "memory", "python", "data", "rag", "vector", "price", "cost"];

struct KeywordEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> docchat_rag::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(KEYWORDS.iter().map(|k| lower.matches(k).count() as f32).collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len()
    }

    fn model(&self) -> &str {
        "keyword-demo"
    }
}

// ---------------------------------------------------------------------------
// QuotingGenerator: answers with the top context chunk
// ---------------------------------------------------------------------------

struct QuotingGenerator;

#[async_trait::async_trait]
impl TextGenerator for QuotingGenerator {
    async fn generate(&self, prompt: &str, _temperature: f32) -> docchat_rag::Result<String> {
        if prompt.starts_with(CONDENSE_INSTRUCTION) {
            // Glue the previous user question onto the follow-up.
            let previous = prompt
                .lines()
                .filter_map(|l| l.strip_prefix("User: "))
                .next_back()
                .unwrap_or_default();
            let follow_up = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Follow-up question: "))
                .unwrap_or_default();
            return Ok(format!("{previous} {follow_up}"));
        }

        let quote = prompt
            .split_once("[1] (")
            .and_then(|(_, rest)| rest.split_once('\n'))
            .and_then(|(_, rest)| rest.lines().next())
            .unwrap_or("I don't know.");
        Ok(format!("According to the documents: {quote}"))
    }

    fn model(&self) -> &str {
        "quoting-demo"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docchat_telemetry::init_telemetry("rag-offline");

    // -- 1. Configure ------------------------------------------------------
    let config = RagConfig::builder().chunk_size(200).chunk_overlap(40).top_k(2).build()?;

    // -- 2. Chunk the corpus ----------------------------------------------
    let documents = vec![
        Document::new(
            "rust",
            "rust.md",
            "Rust is a systems programming language. It achieves memory safety \
             without a garbage collector through its ownership system.",
        ),
        Document::new(
            "python",
            "python.md",
            "Python is an interpreted language widely used for data science and automation.",
        ),
        Document::new(
            "training",
            "training.pdf",
            "The Rust training has a price of 400 euros. The cost includes lunch.",
        )
        .with_page(2),
        Document::new(
            "rag",
            "rag.md",
            "RAG stores chunk embeddings in a vector index and retrieves them at query time.",
        ),
    ];
    let chunker = RecursiveChunker::try_new(config.chunk_size, config.chunk_overlap)?;
    let chunks = split_documents(&documents, &chunker);
    println!("Split {} documents into {} chunks", documents.len(), chunks.len());

    // -- 3. Build once, persisted to a temporary directory ----------------
    let dir = tempfile::tempdir()?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(KeywordEmbedder);
    let mut kb = KnowledgeBase::open(Arc::new(FileIndexStore::new(dir.path()))).await?;
    let index = kb.build(&chunks, embedder.as_ref()).await?;
    println!("Index holds {} entries in {}", index.len(), dir.path().display());

    // A second build is a no-op.
    kb.build(&chunks, embedder.as_ref()).await?;

    // -- 4. Converse -------------------------------------------------------
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .generator(Arc::new(QuotingGenerator))
        .index(index)
        .build()?;

    let mut memory = ConversationMemory::new();
    for question in ["Tell me about the Rust training", "What is its price?", "How does RAG work?"] {
        let result = pipeline.ask(question, &mut memory).await?;
        println!("\nYou: {question}");
        if result.standalone_question != question {
            println!("  (searched for: {})", result.standalone_question);
        }
        println!("Bot: {}", result.answer);
        for source in &result.sources {
            println!("  - {source}");
        }
    }

    println!("\n{} turns in session {}", memory.len(), memory.session_id());
    Ok(())
}
