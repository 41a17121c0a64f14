//! Prompt types for newsdesk.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The prompts used during one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Three-way routing classification
    RouteClassify,
    /// Query expansion for retrieval
    ResearchExpand,
    /// Answer composed from retrieved chunks
    AnswerGrounded,
    /// Reply to small talk
    AnswerConversation,
    /// Request for clarification
    AnswerClarify,
}

impl PromptId {
    /// Every prompt the pipeline needs.
    pub const ALL: [PromptId; 5] = [
        PromptId::RouteClassify,
        PromptId::ResearchExpand,
        PromptId::AnswerGrounded,
        PromptId::AnswerConversation,
        PromptId::AnswerClarify,
    ];

    /// Identifier used in YAML and override file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptId::RouteClassify => "route.classify",
            PromptId::ResearchExpand => "research.expand",
            PromptId::AnswerGrounded => "answer.grounded",
            PromptId::AnswerConversation => "answer.conversation",
            PromptId::AnswerClarify => "answer.clarify",
        }
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Sampling settings
    #[serde(default)]
    pub behavior: PromptBehavior,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Output specification
    pub output: PromptOutputSpec,
}

/// Sampling settings for prompt execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Sampling temperature; provider default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Token cap for the completion
    #[serde(rename = "maxTokens", default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format ("json" requests structured output, otherwise free text)
    pub format: String,
}

impl PromptOutputSpec {
    /// Whether the prompt expects a JSON document back.
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// A fully rendered prompt ready for LLM execution.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub user: String,

    /// Source prompt ID
    pub source_prompt_id: String,

    /// Sampling settings carried over from the definition
    pub behavior: PromptBehavior,

    /// Whether structured JSON output was requested
    pub json_output: bool,
}
