use anyhow::Result;
use async_trait::async_trait;

/// Seam between callers and the concrete Ollama HTTP client.
/// Callers that only need "prompt in, text out" depend on this trait so
/// tests can substitute a scripted generator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run a single non-streamed generation and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identifier of the underlying model, recorded in audit logs.
    fn model(&self) -> &str;
}
