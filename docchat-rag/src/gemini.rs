//! Gemini embedding and generation providers using the Gemini REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

/// The Gemini API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// The default dimensionality for `gemini-embedding-001`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 3072;

/// The default generation model.
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";

/// Read the API key from `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
pub fn api_key_from_env() -> Result<String> {
    std::env::var("GOOGLE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY")).map_err(|_| {
        RagError::ConfigError("GOOGLE_API_KEY or GEMINI_API_KEY must be set".to_string())
    })
}

fn validate_api_key(api_key: String) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
    }
    Ok(api_key)
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// The API's error message, or the raw body when it is not an error object.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

/// POST `body` to `url` and decode the JSON response, mapping every failure
/// with `into_error`.
async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    api_key: &str,
    url: &str,
    body: &B,
    into_error: impl Fn(String) -> RagError,
) -> Result<R> {
    let response =
        client.post(url).header("x-goog-api-key", api_key).json(body).send().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "request failed");
            into_error(format!("request failed: {e}"))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let detail = error_detail(response.text().await.unwrap_or_default());

        error!(provider = "Gemini", %status, "API error");
        return Err(into_error(format!("API returned {status}: {detail}")));
    }

    response.json().await.map_err(|e| {
        error!(provider = "Gemini", error = %e, "failed to parse response");
        into_error(format!("failed to parse response: {e}"))
    })
}

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// # Configuration
///
/// - `model` – defaults to `gemini-embedding-001`.
/// - `task_type` – defaults to `RETRIEVAL_DOCUMENT`; the same task type is
///   used for chunks and questions so both land in the same space.
/// - `output_dimensionality` – optional truncation of the output vector.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    task_type: String,
    dimensions: usize,
    /// If set, passed to the API to truncate the output vector.
    output_dimensionality: Option<usize>,
    base_url: String,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider with the given API key and default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: validate_api_key(api_key.into())?,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            task_type: "RETRIEVAL_DOCUMENT".into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            output_dimensionality: None,
            base_url: GEMINI_BASE_URL.into(),
        })
    }

    /// Create a new provider using `GOOGLE_API_KEY` or `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name. Also set the matching dimensions with
    /// [`with_dimensions`](Self::with_dimensions) if they differ from the default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Declare the native dimensionality of the configured model.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Ask the API to truncate embeddings to `dims` values.
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    /// Set the embedding task type, e.g. `SEMANTIC_SIMILARITY`.
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request<'a>(&'a self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content { role: None, parts: vec![Part { text }] },
            task_type: &self.task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }

    fn error(message: String) -> RagError {
        RagError::EmbeddingError { provider: "Gemini".into(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Gemini", text_len = text.len(), "embedding single text");

        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let response: EmbedContentResponse =
            post_json(&self.client, &self.api_key, &url, &self.request(text), Self::error).await?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "Gemini", batch_size = texts.len(), model = %self.model, "embedding batch");

        let url = format!("{}/models/{}:batchEmbedContents", self.base_url, self.model);
        let body = BatchEmbedContentsRequest {
            requests: texts.iter().map(|text| self.request(text)).collect(),
        };
        let response: BatchEmbedContentsResponse =
            post_json(&self.client, &self.api_key, &url, &body, Self::error).await?;

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`TextGenerator`] backed by the Gemini `generateContent` API.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::gemini::GeminiGenerator;
///
/// let generator = GeminiGenerator::from_env()?.with_model("gemini-2.5-flash");
/// let text = generator.generate("Say hello.", 0.5).await?;
/// ```
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Create a new generator with the given API key and default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: validate_api_key(api_key.into())?,
            model: DEFAULT_GENERATION_MODEL.into(),
            base_url: GEMINI_BASE_URL.into(),
        })
    }

    /// Create a new generator using `GOOGLE_API_KEY` or `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn error(message: String) -> RagError {
        RagError::GenerationError { provider: "Gemini".into(), message }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        debug!(provider = "Gemini", model = %self.model, prompt_len = prompt.len(), "generating");

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature },
        };
        let response: GenerateContentResponse =
            post_json(&self.client, &self.api_key, &url, &body, Self::error).await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Self::error("API returned no candidates".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(Self::error(format!("empty response (finish reason: {reason})")));
        }

        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
