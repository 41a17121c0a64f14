//! Prompt system for newsdesk.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, with built-in defaults compiled in
//! - Per-workspace overrides in `.newsdesk/prompts/<id>.yml`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, PromptSet};
pub use types::{BuiltPrompt, PromptBehavior, PromptDefinition, PromptId, PromptOutputSpec};
