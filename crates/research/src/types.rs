//! Research pipeline type definitions.

use crate::index::ScoredPassage;
use newsdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Content category of an article. Doubles as the index namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    News,
    Tech,
    Business,
    Science,
    Entertainment,
    Sports,
    Politics,
    Economy,
    Education,
    Health,
    Technology,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::News,
        Category::Tech,
        Category::Business,
        Category::Science,
        Category::Entertainment,
        Category::Sports,
        Category::Politics,
        Category::Economy,
        Category::Education,
        Category::Health,
        Category::Technology,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::News => "news",
            Category::Tech => "tech",
            Category::Business => "business",
            Category::Science => "science",
            Category::Entertainment => "entertainment",
            Category::Sports => "sports",
            Category::Politics => "politics",
            Category::Economy => "economy",
            Category::Education => "education",
            Category::Health => "health",
            Category::Technology => "technology",
            Category::Other => "other",
        }
    }

    /// Index namespace holding this category's chunks.
    pub fn namespace(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// One prior message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Input to one pipeline run. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// The user's latest message
    pub query: String,

    /// Prior messages, oldest first
    #[serde(default, alias = "chat_history")]
    pub history: Vec<ChatMessage>,

    /// Optional category scoping retrieval
    #[serde(default)]
    pub category: Option<Category>,
}

impl Turn {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            category: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// A turn must carry a non-blank query.
    pub fn validate(&self) -> AppResult<()> {
        if self.query.trim().is_empty() {
            return Err(AppError::Other("Query cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Render the most recent `window` history entries as `role: content` lines.
///
/// Older entries are dropped; the kept ones stay in chronological order.
pub fn format_chat_history(history: &[ChatMessage], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];

    if recent.is_empty() {
        return "No previous conversation".to_string();
    }

    recent
        .iter()
        .map(|msg| format!("{}: {}", msg.role, msg.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A scored passage of an indexed article.
///
/// Identity is `chunk_id`; `article_id` groups the chunks of one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub article_id: String,
    pub chunk_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub authors: Vec<String>,
    pub published_date: String,
    pub similarity_score: f32,
}

impl Chunk {
    /// Build a chunk from a raw index hit.
    ///
    /// Identity and link fields (`article_id`, `chunk_id`, `title`, `url`) must
    /// be present and non-empty. `description`, `published_date` and `authors`
    /// must be present but may be null. `source` falls back to "other".
    pub fn from_passage(passage: ScoredPassage) -> AppResult<Self> {
        let metadata = &passage.metadata;

        Ok(Self {
            article_id: required_text(metadata, "article_id", "articleId")?,
            chunk_id: required_text(metadata, "chunk_id", "chunkId")?,
            title: required_text(metadata, "title", "title")?,
            url: required_text(metadata, "url", "url")?,
            description: nullable_text(metadata, "description", "description")?,
            published_date: nullable_text(metadata, "published_date", "publishedDate")?,
            authors: authors(metadata)?,
            source: lookup(metadata, "source", "source")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("other")
                .to_string(),
            content: passage.content,
            similarity_score: passage.score,
        })
    }
}

fn lookup<'a>(metadata: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    metadata.get(key).or_else(|| metadata.get(alias))
}

fn required_text(metadata: &Map<String, Value>, key: &str, alias: &str) -> AppResult<String> {
    match lookup(metadata, key, alias) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(AppError::Retrieval(format!("Metadata field '{}' is empty", key))),
        Some(other) => Err(AppError::Retrieval(format!(
            "Metadata field '{}' is not a string: {}",
            key, other
        ))),
        None => Err(AppError::Retrieval(format!("Metadata field '{}' is missing", key))),
    }
}

fn nullable_text(metadata: &Map<String, Value>, key: &str, alias: &str) -> AppResult<String> {
    match lookup(metadata, key, alias) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
        None => Err(AppError::Retrieval(format!("Metadata field '{}' is missing", key))),
    }
}

fn authors(metadata: &Map<String, Value>) -> AppResult<Vec<String>> {
    match lookup(metadata, "authors", "authors") {
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()),
        Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Null) => Ok(Vec::new()),
        Some(other) => Err(AppError::Retrieval(format!(
            "Metadata field 'authors' has unexpected shape: {}",
            other
        ))),
        None => Err(AppError::Retrieval("Metadata field 'authors' is missing".to_string())),
    }
}

/// A resolved reference from the answer text to a selected article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub article_id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub authors: Vec<String>,
    pub published_date: String,
}

impl From<&Chunk> for Citation {
    fn from(chunk: &Chunk) -> Self {
        Self {
            article_id: chunk.article_id.clone(),
            title: chunk.title.clone(),
            url: chunk.url.clone(),
            source: chunk.source.clone(),
            authors: chunk.authors.clone(),
            published_date: chunk.published_date.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn passage(metadata: Value, score: f32) -> ScoredPassage {
        ScoredPassage {
            content: "__Title__: Rates\n__Content__: The central bank raised rates.".to_string(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            score,
        }
    }

    fn full_metadata() -> Value {
        json!({
            "article_id": "art_123",
            "chunk_id": "art_123_0",
            "title": "Central bank raises rates",
            "description": "A quarter point hike",
            "url": "https://example.com/rates",
            "source": "Example Times",
            "authors": ["A. Writer", "B. Editor"],
            "published_date": "2025-03-01",
            "category": "economy"
        })
    }

    #[test]
    fn test_category_parse_and_namespace() {
        assert_eq!("Sports".parse::<Category>(), Ok(Category::Sports));
        assert_eq!(Category::Technology.namespace(), "technology");
        assert!("weather".parse::<Category>().is_err());

        let json = serde_json::to_string(&Category::Economy).unwrap();
        assert_eq!(json, "\"economy\"");
    }

    #[test]
    fn test_turn_validation() {
        assert!(Turn::new("What happened to rates?").validate().is_ok());
        assert!(Turn::new("   ").validate().is_err());
    }

    #[test]
    fn test_turn_accepts_chat_history_alias() {
        let turn: Turn = serde_json::from_value(json!({
            "query": "and then?",
            "chat_history": [{"role": "user", "content": "hi"}],
            "category": "news"
        }))
        .unwrap();
        assert_eq!(turn.history.len(), 1);
        assert_eq!(turn.category, Some(Category::News));
    }

    #[test]
    fn test_format_chat_history_keeps_most_recent() {
        let history: Vec<ChatMessage> = (1..=7)
            .map(|i| ChatMessage::new("user", format!("message {}", i)))
            .collect();

        let formatted = format_chat_history(&history, 5);
        assert!(!formatted.contains("message 1\n"));
        assert!(!formatted.contains("message 2"));
        assert!(formatted.starts_with("user: message 3"));
        assert!(formatted.ends_with("user: message 7"));
        assert_eq!(formatted.matches("user: ").count(), 5);
    }

    #[test]
    fn test_format_empty_history() {
        assert_eq!(format_chat_history(&[], 5), "No previous conversation");
        let history = vec![ChatMessage::new("user", "hello")];
        assert_eq!(format_chat_history(&history, 0), "No previous conversation");
    }

    #[test]
    fn test_chunk_from_passage() {
        let chunk = Chunk::from_passage(passage(full_metadata(), 0.83)).unwrap();
        assert_eq!(chunk.article_id, "art_123");
        assert_eq!(chunk.chunk_id, "art_123_0");
        assert_eq!(chunk.authors, vec!["A. Writer", "B. Editor"]);
        assert_eq!(chunk.similarity_score, 0.83);
        assert!(chunk.content.contains("raised rates"));
    }

    #[test]
    fn test_chunk_missing_field_is_error() {
        let mut metadata = full_metadata();
        metadata.as_object_mut().unwrap().remove("chunk_id");
        let err = Chunk::from_passage(passage(metadata, 0.9)).unwrap_err();
        assert!(err.to_string().contains("chunk_id"));

        let mut metadata = full_metadata();
        metadata.as_object_mut().unwrap().remove("published_date");
        assert!(Chunk::from_passage(passage(metadata, 0.9)).is_err());
    }

    #[test]
    fn test_chunk_empty_id_is_error() {
        let mut metadata = full_metadata();
        metadata["chunk_id"] = json!("");
        assert!(Chunk::from_passage(passage(metadata, 0.9)).is_err());
    }

    #[test]
    fn test_chunk_lenient_fields() {
        let metadata = json!({
            "articleId": "art_9",
            "chunkId": "art_9_2",
            "title": "Title",
            "url": "https://example.com/9",
            "description": null,
            "publishedDate": null,
            "authors": "Solo Author"
        });
        let chunk = Chunk::from_passage(passage(metadata, 0.6)).unwrap();
        assert_eq!(chunk.article_id, "art_9");
        assert_eq!(chunk.source, "other");
        assert_eq!(chunk.description, "");
        assert_eq!(chunk.authors, vec!["Solo Author"]);
    }

    #[test]
    fn test_citation_from_chunk() {
        let chunk = Chunk::from_passage(passage(full_metadata(), 0.7)).unwrap();
        let citation = Citation::from(&chunk);
        assert_eq!(citation.article_id, "art_123");
        assert_eq!(citation.url, "https://example.com/rates");
        assert_eq!(citation.source, "Example Times");
    }
}
