//! Prompt loader for YAML prompt definitions.
//!
//! Every prompt has a built-in definition. A workspace may override any of
//! them by placing `<id>.yml` in `.newsdesk/prompts/`.

use crate::builtin::builtin_source;
use crate::types::{PromptDefinition, PromptId};
use newsdesk_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".newsdesk").join("prompts")
}

/// Load a prompt definition, preferring a workspace override.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.newsdesk/`
/// * `prompt_id` - Which prompt to load
///
/// # Example
/// ```no_run
/// use newsdesk_prompt::{load_prompt, PromptId};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), PromptId::RouteClassify)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: PromptId) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    let (contents, origin) = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        (contents, prompt_file.display().to_string())
    } else {
        (builtin_source(prompt_id).to_string(), "built-in".to_string())
    };

    let definition = parse_prompt(&contents, &origin)?;

    if definition.id != prompt_id.as_str() {
        return Err(AppError::Prompt(format!(
            "Prompt {} declares id '{}', expected '{}'",
            origin, definition.id, prompt_id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({}, {})", definition.id, definition.title, origin);

    Ok(definition)
}

/// Parse and validate a YAML prompt definition.
pub fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// List prompt IDs overridden in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if let Some(temperature) = def.behavior.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Prompt(format!(
                "Prompt {} temperature {} is outside 0.0-2.0",
                def.id, temperature
            )));
        }
    }

    Ok(())
}

/// The full set of prompts, loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct PromptSet {
    definitions: HashMap<PromptId, PromptDefinition>,
}

impl PromptSet {
    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in PromptId::ALL {
            definitions.insert(id, parse_prompt(builtin_source(id), "built-in")?);
        }
        Ok(Self { definitions })
    }

    /// Built-in prompts with any workspace overrides applied.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for id in PromptId::ALL {
            definitions.insert(id, load_prompt(workspace_path, id)?);
        }
        Ok(Self { definitions })
    }

    /// Replace one definition.
    pub fn with_definition(mut self, id: PromptId, definition: PromptDefinition) -> Self {
        self.definitions.insert(id, definition);
        self
    }

    /// Look up a definition.
    pub fn get(&self, id: PromptId) -> AppResult<&PromptDefinition> {
        self.definitions
            .get(&id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not loaded: {}", id)))
    }
}
