//! Vector index abstraction.
//!
//! The pipeline only needs similarity search: a query string in, scored
//! passages out. How the query is embedded and where the vectors live is the
//! implementation's business.

pub mod pinecone;

use async_trait::async_trait;
use newsdesk_core::AppResult;
use serde_json::{Map, Value};

pub use pinecone::PineconeIndex;

/// A raw hit from the vector index, before metadata is validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    /// Passage text
    pub content: String,

    /// Article metadata stored next to the vector
    pub metadata: Map<String, Value>,

    /// Similarity to the query, higher is closer
    pub score: f32,
}

/// Similarity search over indexed article passages.
#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return up to `k` passages closest to `query`, best first.
    ///
    /// `namespace` restricts the search to one partition of the index.
    async fn search(
        &self,
        query: &str,
        k: usize,
        namespace: Option<&str>,
    ) -> AppResult<Vec<ScoredPassage>>;
}
