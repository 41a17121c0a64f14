//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk};
use futures::{Stream, StreamExt};
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
    stream: bool,
}

/// Sampling options nested under `options` in the Ollama API.
#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaResponse {
    /// Prompt plus completion tokens, as reported by the server.
    fn total_tokens(&self) -> u32 {
        self.prompt_eval_count
            .unwrap_or(0)
            .saturating_add(self.eval_count.unwrap_or(0))
    }
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            format: request.format.clone(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: request.stream,
        }
    }

    async fn post_generate(&self, body: &OllamaRequest) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(bytes: &[u8]) -> Option<AppResult<String>> {
    match std::str::from_utf8(bytes) {
        Ok(line) => {
            let line = line.trim();
            (!line.is_empty()).then(|| Ok(line.to_string()))
        }
        Err(e) => Some(Err(AppError::Llm(format!(
            "Stream line is not valid UTF-8: {}",
            e
        )))),
    }
}

/// Split buffered NDJSON bytes into complete lines, leaving any partial tail in `buffer`.
///
/// Lines are decoded only once whole, so a character split across network
/// chunks is reassembled before decoding.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<AppResult<String>> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        lines.extend(decode_line(&line));
    }
    lines
}

/// Whatever remains once the body ends; the last line may lack a newline.
fn drain_tail(buffer: &mut Vec<u8>) -> Vec<AppResult<String>> {
    let tail = std::mem::take(buffer);
    decode_line(&tail).into_iter().collect()
}

fn parse_stream_line(line: &str) -> AppResult<LlmStreamChunk> {
    let response: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| AppError::Llm(format!("Failed to parse chunk: {}", e)))?;

    if response.done {
        tracing::debug!(
            model = %response.model,
            total_tokens = response.total_tokens(),
            "Ollama stream finished"
        );
    }

    Ok(LlmStreamChunk {
        content: response.response,
        done: response.done,
    })
}

/// Decode an NDJSON body into completion chunks.
///
/// Network chunks do not align with lines, so the partial tail is carried
/// between them and flushed when the body ends.
fn decode_ndjson<S, B, E>(body: S) -> impl Stream<Item = AppResult<LlmStreamChunk>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    body.map(Some)
        .chain(futures::stream::once(futures::future::ready(None)))
        .scan(Vec::new(), |buffer, item| {
            let lines = match item {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(bytes.as_ref());
                    drain_lines(buffer)
                }
                Some(Err(e)) => vec![Err(AppError::Llm(format!("Stream error: {}", e)))],
                None => drain_tail(buffer),
            };
            let items: Vec<AppResult<LlmStreamChunk>> = lines
                .into_iter()
                .map(|line| line.and_then(|line| parse_stream_line(&line)))
                .collect();
            futures::future::ready(Some(futures::stream::iter(items)))
        })
        .flatten()
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending completion request to Ollama");

        let mut ollama_request = self.to_ollama_request(request);
        ollama_request.stream = false;

        let response = self.post_generate(&ollama_request).await?;

        // For non-streaming, Ollama returns a single JSON object
        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            model = %ollama_response.model,
            total_tokens = ollama_response.total_tokens(),
            "Received completion from Ollama"
        );

        Ok(LlmResponse {
            content: ollama_response.response,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(model = %request.model, "Starting streaming request to Ollama");

        let mut ollama_request = self.to_ollama_request(request);
        ollama_request.stream = true;

        let response = self.post_generate(&ollama_request).await?;

        Ok(Box::pin(decode_ndjson(response.bytes_stream())))
    }
}
