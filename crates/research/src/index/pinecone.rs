//! Pinecone-backed passage index.
//!
//! Queries are embedded locally and sent to the index host's `/query`
//! endpoint. Passage text lives in the `text` metadata key.

use super::{PassageIndex, ScoredPassage};
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use newsdesk_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

const TEXT_KEY: &str = "text";
const API_VERSION: &str = "2024-07";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl QueryMatch {
    fn into_passage(self) -> ScoredPassage {
        let mut metadata = self.metadata.unwrap_or_default();
        let content = match metadata.remove(TEXT_KEY) {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };

        ScoredPassage {
            content,
            metadata,
            score: self.score,
        }
    }
}

/// Vector index hosted on Pinecone.
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl PineconeIndex {
    /// `host` is the index host URL, e.g. `https://news-abc123.svc.pinecone.io`.
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };

        Self {
            client: Client::new(),
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embedder,
        }
    }
}

#[async_trait]
impl PassageIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        namespace: Option<&str>,
    ) -> AppResult<Vec<ScoredPassage>> {
        let vector = self.embedder.embed(query).await?;

        let body = QueryRequest {
            vector,
            top_k: k,
            namespace,
            include_metadata: true,
            include_values: false,
        };

        let url = format!("{}/query", self.host);
        debug!(url = %url, top_k = k, namespace = ?namespace, "Querying Pinecone");

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to query Pinecone: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Pinecone API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Pinecone response: {}", e)))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(QueryMatch::into_passage)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::OllamaEmbedder;
    use serde_json::json;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(OllamaEmbedder::new("http://localhost:11434", "mxbai-embed-large", 1024).unwrap())
    }

    #[test]
    fn test_host_normalisation() {
        let index = PineconeIndex::new("news-abc.svc.pinecone.io/", "key", embedder());
        assert_eq!(index.host, "https://news-abc.svc.pinecone.io");

        let index = PineconeIndex::new("http://localhost:5080", "key", embedder());
        assert_eq!(index.host, "http://localhost:5080");
    }

    #[test]
    fn test_request_body_uses_camel_case() {
        let body = serde_json::to_value(QueryRequest {
            vector: vec![0.1, 0.2],
            top_k: 5,
            namespace: Some("sports"),
            include_metadata: true,
            include_values: false,
        })
        .unwrap();

        assert_eq!(body["topK"], 5);
        assert_eq!(body["namespace"], "sports");
        assert_eq!(body["includeMetadata"], true);

        let body = serde_json::to_value(QueryRequest {
            vector: vec![],
            top_k: 5,
            namespace: None,
            include_metadata: true,
            include_values: false,
        })
        .unwrap();
        assert!(body.get("namespace").is_none());
    }

    #[test]
    fn test_match_moves_text_into_content() {
        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                {
                    "id": "vec-1",
                    "score": 0.71,
                    "metadata": {"text": "Passage body", "chunk_id": "art_1_0"}
                },
                {"id": "vec-2", "score": 0.4}
            ],
            "namespace": "news"
        }))
        .unwrap();

        let passages: Vec<_> = response
            .matches
            .into_iter()
            .map(QueryMatch::into_passage)
            .collect();

        assert_eq!(passages[0].content, "Passage body");
        assert!(!passages[0].metadata.contains_key("text"));
        assert_eq!(passages[0].metadata["chunk_id"], "art_1_0");
        assert_eq!(passages[0].score, 0.71);
        assert!(passages[1].content.is_empty());
        assert!(passages[1].metadata.is_empty());
    }
}
