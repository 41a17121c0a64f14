//! Generation capability interface.
//!
//! The research pipeline uses two call shapes: structured output (a request
//! with [`LlmRequest::with_json_format`], parsed by the caller) and free text,
//! optionally streamed token by token.

use futures::Stream;
use newsdesk_core::AppResult;
use std::pin::Pin;

/// One rendered prompt addressed to one model.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,

    /// Model identifier (e.g., "llama3.2")
    pub model: String,

    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0); provider default when absent
    pub temperature: Option<f32>,

    pub stream: bool,

    /// Output format constraint ("json" for structured output)
    pub format: Option<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            stream: false,
            format: None,
        }
    }

    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask the provider to constrain output to a single JSON document.
    pub fn with_json_format(mut self) -> Self {
        self.format = Some("json".to_string());
        self
    }
}

/// Full text of a non-streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: String,
}

/// Incremental piece of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmStreamChunk {
    pub content: String,

    /// Set on the provider's final chunk; nothing follows it
    pub done: bool,
}

/// Stream of completion pieces.
pub type LlmStream = Pin<Box<dyn Stream<Item = AppResult<LlmStreamChunk>> + Send>>;

/// Trait for generation providers.
///
/// Implementations must be safe to share across concurrent turns. They must
/// not retry internally beyond what the provider itself does; the pipeline
/// treats every failed call as final.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("Classify this", "llama3.2")
            .with_temperature(0.0)
            .with_max_tokens(200)
            .with_json_format();

        assert_eq!(request.prompt, "Classify this");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(200));
        assert_eq!(request.format.as_deref(), Some("json"));
        assert!(!request.stream);
        assert!(request.with_streaming().stream);
    }
}
