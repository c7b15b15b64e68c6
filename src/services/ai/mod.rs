pub mod fallback;
pub mod groq;
pub mod ollama;

use async_trait::async_trait;

/// Free-text generator used when no command matches a message.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
