//! Concurrent retrieval: one index search per expanded query.
//!
//! All branches run at once and are joined before returning. A branch that
//! fails, times out or returns malformed items only loses its own results.

use crate::collection::ChunkCollection;
use crate::expansion::ExpandedQuery;
use crate::guard::bounded;
use crate::index::PassageIndex;
use crate::types::{Category, Chunk};
use newsdesk_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What happened to one retrieval branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchOutcome {
    pub query: String,
    /// Chunks the branch contributed before deduplication
    pub chunks: usize,
    /// Items skipped because their metadata was unusable
    pub skipped: usize,
    /// Set when the whole branch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalReport {
    pub branches: Vec<BranchOutcome>,
}

impl RetrievalReport {
    pub fn succeeded(&self) -> usize {
        self.branches.iter().filter(|b| b.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.branches.len() - self.succeeded()
    }

    pub fn chunks_seen(&self) -> usize {
        self.branches.iter().map(|b| b.chunks).sum()
    }
}

/// Fans expanded queries out to the passage index.
#[derive(Clone)]
pub struct ParallelRetriever {
    index: Arc<dyn PassageIndex>,
    results_per_query: usize,
    timeout: Duration,
    default_namespace: Option<String>,
}

impl ParallelRetriever {
    pub fn new(index: Arc<dyn PassageIndex>, results_per_query: usize, timeout: Duration) -> Self {
        Self {
            index,
            results_per_query,
            timeout,
            default_namespace: None,
        }
    }

    /// Namespace searched when the turn has no category.
    pub fn with_default_namespace(mut self, namespace: Option<String>) -> Self {
        self.default_namespace = namespace;
        self
    }

    fn namespace_for(&self, category: Option<Category>) -> Option<&str> {
        category
            .map(|c| c.namespace())
            .or(self.default_namespace.as_deref())
    }

    /// Search every query concurrently and merge the results.
    ///
    /// Never fails: an empty collection with all branches marked failed is a
    /// valid outcome.
    pub async fn retrieve_all(
        &self,
        queries: &[ExpandedQuery],
        category: Option<Category>,
        cancel: &CancellationToken,
    ) -> (ChunkCollection, RetrievalReport) {
        let namespace = self.namespace_for(category);

        tracing::debug!(
            index = self.index.name(),
            branches = queries.len(),
            namespace = ?namespace,
            "Starting retrieval fan-out"
        );

        let branches = queries.iter().map(|query| async move {
            let result = self.run_branch(query, namespace, cancel).await;
            (query, result)
        });

        let outcomes = futures::future::join_all(branches).await;

        let mut collection = ChunkCollection::new();
        let mut report = RetrievalReport::default();

        for (query, outcome) in outcomes {
            match outcome {
                Ok((chunks, skipped)) => {
                    tracing::debug!(query = %query, count = chunks.len(), skipped, "Branch returned chunks");
                    report.branches.push(BranchOutcome {
                        query: query.to_string(),
                        chunks: chunks.len(),
                        skipped,
                        error: None,
                    });
                    collection.extend(chunks);
                }
                Err(err) => {
                    tracing::warn!(query = %query, error = %err, "Retrieval branch failed");
                    report.branches.push(BranchOutcome {
                        query: query.to_string(),
                        chunks: 0,
                        skipped: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            unique_chunks = collection.len(),
            "Retrieval complete"
        );

        (collection, report)
    }

    async fn run_branch(
        &self,
        query: &ExpandedQuery,
        namespace: Option<&str>,
        cancel: &CancellationToken,
    ) -> AppResult<(Vec<Chunk>, usize)> {
        let search = self
            .index
            .search(query.as_str(), self.results_per_query, namespace);

        let passages = bounded("retrieval", self.timeout, cancel, search).await?;

        let mut chunks = Vec::with_capacity(passages.len());
        let mut skipped = 0;

        for passage in passages {
            match Chunk::from_passage(passage) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(query = %query, error = %e, "Skipping malformed passage");
                }
            }
        }

        if chunks.is_empty() && skipped > 0 {
            return Err(AppError::Retrieval(format!(
                "all {} passages had unusable metadata",
                skipped
            )));
        }

        Ok((chunks, skipped))
    }
}
