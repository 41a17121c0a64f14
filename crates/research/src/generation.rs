//! Prompt rendering and generation calls shared by every stage.

use crate::guard::bounded;
use newsdesk_core::{AppError, AppResult};
use newsdesk_llm::{LlmClient, LlmRequest, LlmStream};
use newsdesk_prompt::{build_prompt, PromptId, PromptSet};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Renders a prompt and sends it to the generation capability under a deadline.
#[derive(Clone)]
pub struct Generator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    timeout: Duration,
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, timeout: Duration) -> Self {
        Self {
            llm,
            prompts,
            timeout,
        }
    }

    fn request(
        &self,
        id: PromptId,
        model: &str,
        variables: &HashMap<String, String>,
    ) -> AppResult<LlmRequest> {
        let built = build_prompt(self.prompts.get(id)?, variables)?;

        let mut request = LlmRequest::new(built.user, model);
        if let Some(temperature) = built.behavior.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = built.behavior.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if built.json_output {
            request = request.with_json_format();
        }
        Ok(request)
    }

    /// One complete response.
    pub async fn complete(
        &self,
        id: PromptId,
        model: &str,
        variables: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        let request = self.request(id, model, variables)?;
        let label = format!("{} generation", id);

        let response = bounded(&label, self.timeout, cancel, self.llm.complete(&request)).await?;
        Ok(response.content)
    }

    /// A token stream. Only opening the stream is bounded here; callers bound each chunk.
    pub async fn stream(
        &self,
        id: PromptId,
        model: &str,
        variables: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> AppResult<LlmStream> {
        let request = self.request(id, model, variables)?.with_streaming();
        let label = format!("{} stream", id);

        bounded(&label, self.timeout, cancel, self.llm.stream(&request)).await
    }
}

/// Parse a structured reply, tolerating code fences and surrounding prose.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    let body = json_body(raw)
        .ok_or_else(|| AppError::Llm(format!("No JSON document in reply: {}", preview(raw))))?;

    serde_json::from_str(body)
        .map_err(|e| AppError::Llm(format!("Malformed structured reply ({}): {}", e, preview(raw))))
}

fn json_body(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    let close = if raw[start..].starts_with('{') { '}' } else { ']' };
    let end = raw.rfind(close)?;
    (end > start).then(|| &raw[start..=end])
}

fn preview(raw: &str) -> String {
    raw.chars().take(120).collect()
}
