//! Routing: decide how a turn should be handled.

use crate::generation::{parse_structured, Generator};
use crate::types::{format_chat_history, Turn};
use newsdesk_core::AppResult;
use newsdesk_prompt::PromptId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// The three ways a turn can be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    GeneralConversation,
    AskMoreInfo,
    ConductResearch,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::GeneralConversation => "general_conversation",
            Route::AskMoreInfo => "ask_more_info",
            Route::ConductResearch => "conduct_research",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route plus the classifier's one-line justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    #[serde(rename = "routing_decision")]
    pub route: Route,
    #[serde(rename = "routing_reasoning", default)]
    pub reasoning: String,
}

impl RoutingDecision {
    /// Used whenever classification cannot produce a decision.
    pub fn fallback() -> Self {
        Self {
            route: Route::ConductResearch,
            reasoning: "classification unavailable".to_string(),
        }
    }
}

/// Parse the classifier's structured reply.
pub fn parse_routing_decision(raw: &str) -> AppResult<RoutingDecision> {
    parse_structured(raw)
}

/// Classifies turns with the generation capability.
#[derive(Clone)]
pub struct Router {
    generator: Generator,
    model: String,
    history_window: usize,
}

impl Router {
    pub fn new(generator: Generator, model: impl Into<String>, history_window: usize) -> Self {
        Self {
            generator,
            model: model.into(),
            history_window,
        }
    }

    /// Classify a turn. `None` when the call fails or the reply is unusable.
    pub async fn classify(&self, turn: &Turn, cancel: &CancellationToken) -> Option<RoutingDecision> {
        let mut variables = HashMap::new();
        variables.insert("user_message".to_string(), turn.query.clone());
        variables.insert(
            "chat_history".to_string(),
            format_chat_history(&turn.history, self.history_window),
        );

        let result = async {
            let raw = self
                .generator
                .complete(PromptId::RouteClassify, &self.model, &variables, cancel)
                .await?;
            parse_routing_decision(&raw)
        }
        .await;

        match result {
            Ok(decision) => Some(decision),
            Err(e) => {
                tracing::warn!(error = %e, "Routing classification failed");
                None
            }
        }
    }

    /// Classify a turn, falling back to research when classification fails.
    pub async fn route(&self, turn: &Turn, cancel: &CancellationToken) -> RoutingDecision {
        let decision = self
            .classify(turn, cancel)
            .await
            .unwrap_or_else(RoutingDecision::fallback);

        tracing::info!(route = %decision.route, reasoning = %decision.reasoning, "Routed turn");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_route() {
        for (raw, route) in [
            ("general_conversation", Route::GeneralConversation),
            ("ask_more_info", Route::AskMoreInfo),
            ("conduct_research", Route::ConductResearch),
        ] {
            let reply = format!(
                r#"{{"routing_decision": "{}", "routing_reasoning": "because"}}"#,
                raw
            );
            let decision = parse_routing_decision(&reply).unwrap();
            assert_eq!(decision.route, route);
            assert_eq!(decision.reasoning, "because");
        }
    }

    #[test]
    fn test_reasoning_is_optional() {
        let decision = parse_routing_decision(r#"{"routing_decision": "ask_more_info"}"#).unwrap();
        assert_eq!(decision.route, Route::AskMoreInfo);
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_unknown_route_rejected() {
        assert!(parse_routing_decision(r#"{"routing_decision": "do_nothing"}"#).is_err());
        assert!(parse_routing_decision("conduct_research").is_err());
    }

    #[test]
    fn test_fallback_is_research() {
        let fallback = RoutingDecision::fallback();
        assert_eq!(fallback.route, Route::ConductResearch);
        assert_eq!(fallback.reasoning, "classification unavailable");
    }
}
