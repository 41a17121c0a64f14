//! Generation capability for newsdesk.
//!
//! This crate provides a provider-agnostic abstraction over the Large Language
//! Model that routes turns, expands queries and composes answers. Providers
//! implement [`LlmClient`]; the research pipeline only ever sees the trait.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use newsdesk_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Summarise today's rate decision", "llama3.2")
//!     .with_json_format();
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::ProviderType;
