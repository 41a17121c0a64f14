//! Retrieval-augmented research pipeline for newsdesk.
//!
//! Each conversational turn is routed to one of three outcomes. Research
//! turns are expanded into several search queries, retrieved concurrently,
//! filtered to the most relevant chunks and answered with inline
//! `[[art_...]]` citations that are resolved back to article metadata.
//!
//! # Example
//! ```no_run
//! use newsdesk_research::{ModelRoles, ResearchPipeline, Turn};
//! use newsdesk_research::embeddings::OllamaEmbedder;
//! use newsdesk_research::index::PineconeIndex;
//! use newsdesk_core::PipelineConfig;
//! use newsdesk_llm::OllamaClient;
//! use newsdesk_prompt::PromptSet;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = Arc::new(OllamaEmbedder::new("http://localhost:11434", "mxbai-embed-large", 1024)?);
//! let index = Arc::new(PineconeIndex::new("news-abc.svc.pinecone.io", "key", embedder));
//! let pipeline = ResearchPipeline::new(
//!     Arc::new(OllamaClient::new()),
//!     index,
//!     PromptSet::builtin()?,
//!     PipelineConfig::default(),
//!     ModelRoles::uniform("llama3.2"),
//! )?;
//!
//! let outcome = pipeline.run(&Turn::new("What did the central bank decide?")).await?;
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod citations;
pub mod collection;
pub mod embeddings;
pub mod expansion;
pub mod generation;
mod guard;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod routing;
pub mod selection;
pub mod types;

#[cfg(test)]
mod tests;

pub use citations::link_citations;
pub use collection::ChunkCollection;
pub use expansion::{ExpandedQuery, QueryExpander};
pub use index::{PassageIndex, ScoredPassage};
pub use pipeline::{ModelRoles, ResearchPipeline, StreamEvent, TurnOutcome};
pub use retriever::{ParallelRetriever, RetrievalReport};
pub use routing::{Route, Router, RoutingDecision};
pub use selection::{select, SelectionPolicy};
pub use types::{Category, ChatMessage, Chunk, Citation, Turn};
