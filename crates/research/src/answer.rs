//! Answer composition for each route.

use crate::generation::Generator;
use crate::routing::{Route, RoutingDecision};
use crate::types::{format_chat_history, Chunk, Turn};
use newsdesk_core::AppResult;
use newsdesk_llm::LlmStream;
use newsdesk_prompt::PromptId;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

const CONTENT_MARKER: &str = "__Content__:";
const DOCUMENT_SEPARATOR: &str = "\n\n----------\n\n";
const NO_DOCUMENTS: &str = "No documents were retrieved.";

/// What the answer should be built from.
#[derive(Debug, Clone, Copy)]
pub enum AnswerBasis<'a> {
    /// Small talk or a clarification request, no evidence
    Direct(&'a RoutingDecision),
    /// Research answer over the selected chunks
    Grounded(&'a [Chunk]),
}

/// Ingested content may carry a `__Title__:`/`__Content__:` header; keep the body.
fn body_text(content: &str) -> &str {
    match content.split_once(CONTENT_MARKER) {
        Some((_, body)) => body.trim(),
        None => content.trim(),
    }
}

/// Render the selection as the document block of the grounded prompt.
pub fn format_documents(selection: &[Chunk]) -> String {
    if selection.is_empty() {
        return NO_DOCUMENTS.to_string();
    }

    selection
        .iter()
        .map(|chunk| {
            format!(
                "Article ID: {}\nTitle: {}\nDescription: {}\nContent: {}\nSource: {}\nPublished Date: {}\nAuthors: {}",
                chunk.article_id,
                chunk.title,
                chunk.description,
                body_text(&chunk.content),
                chunk.source,
                chunk.published_date,
                chunk.authors.join(", "),
            )
        })
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// Builds and sends the answer prompt.
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Generator,
    model: String,
    history_window: usize,
}

impl AnswerComposer {
    pub fn new(generator: Generator, model: impl Into<String>, history_window: usize) -> Self {
        Self {
            generator,
            model: model.into(),
            history_window,
        }
    }

    fn prompt(&self, turn: &Turn, basis: AnswerBasis<'_>) -> (PromptId, HashMap<String, String>) {
        let mut variables = HashMap::new();
        variables.insert("user_message".to_string(), turn.query.clone());
        variables.insert(
            "chat_history".to_string(),
            format_chat_history(&turn.history, self.history_window),
        );

        let id = match basis {
            AnswerBasis::Direct(decision) => {
                variables.insert("routing_reasoning".to_string(), decision.reasoning.clone());
                match decision.route {
                    Route::GeneralConversation => PromptId::AnswerConversation,
                    Route::AskMoreInfo => PromptId::AnswerClarify,
                    // Research with nothing retrieved
                    Route::ConductResearch => {
                        variables.insert("retrieved_documents".to_string(), format_documents(&[]));
                        PromptId::AnswerGrounded
                    }
                }
            }
            AnswerBasis::Grounded(selection) => {
                variables.insert("retrieved_documents".to_string(), format_documents(selection));
                PromptId::AnswerGrounded
            }
        };

        (id, variables)
    }

    /// Generate the full answer in one call.
    pub async fn compose(
        &self,
        turn: &Turn,
        basis: AnswerBasis<'_>,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        let (id, variables) = self.prompt(turn, basis);
        tracing::debug!(prompt = %id, "Composing answer");
        self.generator
            .complete(id, &self.model, &variables, cancel)
            .await
    }

    /// Open a token stream for the answer.
    pub async fn compose_stream(
        &self,
        turn: &Turn,
        basis: AnswerBasis<'_>,
        cancel: &CancellationToken,
    ) -> AppResult<LlmStream> {
        let (id, variables) = self.prompt(turn, basis);
        tracing::debug!(prompt = %id, "Streaming answer");
        self.generator
            .stream(id, &self.model, &variables, cancel)
            .await
    }
}
