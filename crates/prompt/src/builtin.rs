//! Built-in prompt definitions compiled into the binary.

use crate::types::PromptId;

/// YAML source of the built-in definition for a prompt.
pub fn builtin_source(id: PromptId) -> &'static str {
    match id {
        PromptId::RouteClassify => include_str!("../prompts/route.classify.yml"),
        PromptId::ResearchExpand => include_str!("../prompts/research.expand.yml"),
        PromptId::AnswerGrounded => include_str!("../prompts/answer.grounded.yml"),
        PromptId::AnswerConversation => include_str!("../prompts/answer.conversation.yml"),
        PromptId::AnswerClarify => include_str!("../prompts/answer.clarify.yml"),
    }
}
