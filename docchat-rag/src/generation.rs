//! Text generation trait.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into text.
///
/// Implementations report failures as
/// [`RagError::GenerationError`](crate::RagError::GenerationError). They do
/// not retry; callers decide what to do with a failed turn.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::TextGenerator;
///
/// let answer = generator.generate("Say hello.", 0.5).await?;
/// ```
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt` at the given sampling temperature.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// Return an identifier of the generation model.
    fn model(&self) -> &str;
}
