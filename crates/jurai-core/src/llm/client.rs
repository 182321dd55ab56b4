use crate::constants::defaults;
use crate::error::{JuraiError, Result};
use crate::llm::openai::OpenAIClient;
use crate::llm::provider::ModelConfig;
use crate::llm::sentence::SentenceBuffer;
use crate::llm::traits::{LlmClient, LlmResponse, Message, StreamEvent};
use crate::tools::ToolDefinition;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Streamed {
    /// The stream finished with plain text.
    Text(String),
    /// A tool-call fragment appeared. Nothing was decoded; re-issue the
    /// request with [`ModelClient::complete`] to get a parseable call.
    ToolCallPending,
}

/// One model endpoint plus its retry budget. Cheap to clone; agents built
/// from the same config share the underlying transport.
#[derive(Clone)]
pub struct ModelClient {
    config: ModelConfig,
    llm: Arc<dyn LlmClient>,
}

impl ModelClient {
    pub fn new(config: ModelConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self { config, llm }
    }

    /// Build the HTTP transport described by `config`.
    pub fn from_config(config: ModelConfig) -> Result<Self> {
        if config.provider().needs_api_key() && config.api_key().is_none() {
            return Err(JuraiError::Config(format!(
                "No API key configured for provider {}",
                config.provider()
            )));
        }
        if config.base_url().is_empty() {
            return Err(JuraiError::Config(format!(
                "No base URL configured for provider {}",
                config.provider()
            )));
        }
        let llm = Arc::new(OpenAIClient::from_config(&config));
        Ok(Self::new(config, llm))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Non-streamed completion, retried on transient failures.
    pub async fn complete(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse> {
        let response = self
            .with_retries("chat", || self.llm.chat(messages, tools))
            .await?;

        match response.choice {
            Some(ref message) => tracing::debug!(
                model = %self.config.label(),
                "model output: {}",
                preview(&message.content)
            ),
            None => tracing::debug!(model = %self.config.label(), "model returned no choices"),
        }
        Ok(response)
    }

    /// Streamed completion. Text is accumulated in full and, independently,
    /// handed to `on_sentence` one complete sentence at a time; the trailing
    /// partial sentence is flushed when the stream ends.
    pub async fn complete_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_sentence: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Streamed> {
        let mut stream = self
            .with_retries("chat_stream", || self.llm.chat_stream(messages, tools))
            .await?;

        let mut content = String::new();
        let mut sentences = SentenceBuffer::new();

        while let Some(event) = stream.next().await {
            if event.is_tool_fragment() {
                tracing::debug!(
                    model = %self.config.label(),
                    "tool-call fragment in stream, falling back to non-streamed request"
                );
                if let Some(rest) = sentences.flush() {
                    on_sentence(&rest);
                }
                return Ok(Streamed::ToolCallPending);
            }

            match event {
                StreamEvent::TextDelta(delta) => {
                    content.push_str(&delta);
                    for sentence in sentences.push(&delta) {
                        on_sentence(&sentence);
                    }
                }
                StreamEvent::Done => break,
                StreamEvent::Error(err) => return Err(JuraiError::Llm(err)),
                StreamEvent::ToolCallStart { .. }
                | StreamEvent::ToolCallDelta { .. }
                | StreamEvent::ToolCallEnd { .. } => {}
            }
        }

        if let Some(rest) = sentences.flush() {
            on_sentence(&rest);
        }
        tracing::debug!(model = %self.config.label(), "streamed output: {}", preview(&content));
        Ok(Streamed::Text(content))
    }

    async fn with_retries<T, F, Fut>(&self, what: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let budget = self.config.retries();
        let mut tries = 0u32;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && tries < budget => {
                    tries += 1;
                    let delay = backoff(self.config.retry_backoff(), tries);
                    tracing::warn!(
                        model = %self.config.label(),
                        "{what} failed (attempt {tries}/{budget}), retrying in {delay:?}: {e}"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff: `base * 2^(try-1)`, capped.
fn backoff(base: Duration, tries: u32) -> Duration {
    let cap = Duration::from_millis(defaults::RETRY_BACKOFF_CAP_MS);
    let factor = 2u32.saturating_pow(tries.saturating_sub(1));
    base.saturating_mul(factor).min(cap)
}

pub(crate) fn preview(text: &str) -> String {
    truncate_str(text, defaults::PREVIEW_CHARS)
}

pub(crate) fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff(base, 1), Duration::from_millis(500));
        assert_eq!(backoff(base, 2), Duration::from_millis(1000));
        assert_eq!(backoff(base, 3), Duration::from_millis(2000));
        assert_eq!(backoff(base, 10), Duration::from_millis(defaults::RETRY_BACKOFF_CAP_MS));
        assert_eq!(backoff(Duration::ZERO, 4), Duration::ZERO);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("Datenschutz-Grundverordnung", 5), "Daten...");
        assert_eq!(truncate_str("äöüäöü", 3), "äöü...");
    }
}
