//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use newsdesk_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Renders the template with Handlebars and carries the definition's
/// sampling settings and output format along, so the caller can turn the
/// result straight into a generation request.
///
/// # Example
/// ```no_run
/// use newsdesk_prompt::{build_prompt, PromptSet, PromptId};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompts = PromptSet::builtin()?;
/// let mut vars = HashMap::new();
/// vars.insert("user_message".to_string(), "What happened to rates?".to_string());
///
/// let built = build_prompt(prompts.get(PromptId::RouteClassify)?, &vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::trace!("Building prompt: {}", definition.id);

    let rendered = render_template(&definition.template, variables)?;

    Ok(BuiltPrompt {
        user: rendered,
        source_prompt_id: definition.id.clone(),
        behavior: definition.behavior.clone(),
        json_output: definition.output.is_json(),
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text prompts, never HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
