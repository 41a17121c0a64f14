//! Query expansion: rewrite a turn into short vector-search queries.

use crate::generation::{parse_structured, Generator};
use crate::types::{format_chat_history, Turn};
use newsdesk_core::AppResult;
use newsdesk_prompt::PromptId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio_util::sync::CancellationToken;

const MIN_WORDS: usize = 5;
const MAX_WORDS: usize = 12;

/// A search query of 5 to 12 words made only of letters, digits and spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExpandedQuery(String);

impl ExpandedQuery {
    /// Normalise whitespace and validate. `None` if the candidate breaks the rules.
    pub fn parse(candidate: &str) -> Option<Self> {
        let words: Vec<&str> = candidate.split_whitespace().collect();

        if !(MIN_WORDS..=MAX_WORDS).contains(&words.len()) {
            return None;
        }

        let clean = words
            .iter()
            .all(|word| word.chars().all(char::is_alphanumeric));
        if !clean {
            return None;
        }

        Some(Self(words.join(" ")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExpandedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpansionReply {
    Object { chunk_queries: Vec<serde_json::Value> },
    List(Vec<serde_json::Value>),
}

/// Validate a structured reply into at most `max_queries` distinct queries.
///
/// Invalid or duplicate items are dropped; the result is never padded.
pub fn parse_expanded_queries(raw: &str, max_queries: usize) -> AppResult<Vec<ExpandedQuery>> {
    let items = match parse_structured::<ExpansionReply>(raw)? {
        ExpansionReply::Object { chunk_queries } => chunk_queries,
        ExpansionReply::List(items) => items,
    };

    let mut seen = HashSet::new();
    let mut queries = Vec::new();

    for item in &items {
        let Some(text) = item.as_str() else {
            tracing::debug!(item = %item, "Dropping non-string expansion item");
            continue;
        };
        let Some(query) = ExpandedQuery::parse(text) else {
            tracing::debug!(query = %text, "Dropping malformed expansion query");
            continue;
        };
        if !seen.insert(query.as_str().to_lowercase()) {
            continue;
        }
        queries.push(query);
        if queries.len() == max_queries {
            break;
        }
    }

    if queries.len() < max_queries {
        tracing::warn!(
            wanted = max_queries,
            got = queries.len(),
            offered = items.len(),
            "Expansion produced fewer valid queries than requested"
        );
    }

    Ok(queries)
}

/// Produces the retrieval queries for a research turn.
#[derive(Clone)]
pub struct QueryExpander {
    generator: Generator,
    model: String,
    max_queries: usize,
    history_window: usize,
}

impl QueryExpander {
    pub fn new(
        generator: Generator,
        model: impl Into<String>,
        max_queries: usize,
        history_window: usize,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            max_queries,
            history_window,
        }
    }

    /// Expand a turn. Any failure yields an empty list, never an error.
    pub async fn expand(&self, turn: &Turn, cancel: &CancellationToken) -> Vec<ExpandedQuery> {
        match self.try_expand(turn, cancel).await {
            Ok(queries) => {
                tracing::info!(count = queries.len(), "Expanded query");
                queries
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query expansion failed; continuing without queries");
                Vec::new()
            }
        }
    }

    async fn try_expand(
        &self,
        turn: &Turn,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<ExpandedQuery>> {
        let mut variables = HashMap::new();
        variables.insert("user_message".to_string(), turn.query.clone());
        variables.insert(
            "chat_history".to_string(),
            format_chat_history(&turn.history, self.history_window),
        );
        variables.insert(
            "category".to_string(),
            turn.category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "any".to_string()),
        );
        variables.insert("query_count".to_string(), self.max_queries.to_string());

        let raw = self
            .generator
            .complete(PromptId::ResearchExpand, &self.model, &variables, cancel)
            .await?;

        parse_expanded_queries(&raw, self.max_queries)
    }
}
