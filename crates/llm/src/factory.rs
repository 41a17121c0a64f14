//! LLM provider factory.
//!
//! Creates the shared generation client once at startup. The resulting
//! `Arc<dyn LlmClient>` is handed to the research pipeline and reused by every
//! turn; clients are safe for concurrent use.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Errors
/// Returns an error message if the provider is unknown.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    _api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or(ProviderType::Ollama.default_endpoint());
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        None => Err(format!("Unknown provider: {}", provider)),
    }
}
