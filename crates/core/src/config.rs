//! Configuration management for newsdesk.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.newsdesk/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. Secrets are never stored in the file; the file names the
//! environment variable that holds them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .newsdesk/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider (e.g., "ollama")
    pub provider: String,

    /// Default model identifier, used for any role without its own model
    pub model: String,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Per-role generation settings
    pub llm: LlmSettings,

    /// Vector index settings
    pub index: IndexSettings,

    /// Query embedding settings
    pub embedding: EmbeddingSettings,

    /// Retrieval pipeline tuning
    pub pipeline: PipelineConfig,
}

/// The distinct generation calls made during one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Routing classification
    Router,
    /// Query expansion
    Expander,
    /// Answer composition (grounded and direct)
    Answer,
}

/// Generation settings from config.yaml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider endpoint (e.g., "http://localhost:11434")
    pub endpoint: Option<String>,

    /// Model for routing classification
    pub router_model: Option<String>,

    /// Model for query expansion
    pub expander_model: Option<String>,

    /// Model for answer composition
    pub answer_model: Option<String>,
}

/// Vector index connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    /// Index host URL (e.g., "https://articles-abc123.svc.pinecone.io")
    pub host: Option<String>,

    /// Name of the environment variable holding the index API key
    #[serde(default = "default_index_api_key_env")]
    pub api_key_env: String,

    /// Namespace used when a turn carries no category
    pub default_namespace: Option<String>,
}

fn default_index_api_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            host: None,
            api_key_env: default_index_api_key_env(),
            default_namespace: None,
        }
    }
}

/// Query embedding settings.
///
/// The model must match the one used at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Embedding endpoint (Ollama-compatible)
    pub endpoint: String,

    /// Embedding model name
    pub model: String,

    /// Expected vector dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "mxbai-embed-large".to_string(),
            dimensions: 1024,
        }
    }
}

/// Tuning knobs for the retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Chunks must score strictly above this to be selected
    pub relevance_threshold: f32,

    /// Upper bound on the final selection
    pub max_selected: usize,

    /// Results requested from the index per expanded query
    pub results_per_query: usize,

    /// Upper bound on expanded queries per turn
    pub max_queries: usize,

    /// Most recent history entries included in prompts
    pub history_window: usize,

    /// Deadline for each generation call
    pub generation_timeout_secs: u64,

    /// Deadline for each retrieval branch
    pub retrieval_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.5,
            max_selected: 5,
            results_per_query: 5,
            max_queries: 3,
            history_window: 5,
            generation_timeout_secs: 30,
            retrieval_timeout_secs: 15,
        }
    }
}

impl PipelineConfig {
    /// Reject settings that would make the pipeline meaningless.
    pub fn validate(&self) -> AppResult<()> {
        if !self.relevance_threshold.is_finite() {
            return Err(AppError::Config(format!(
                "relevanceThreshold must be finite, got {}",
                self.relevance_threshold
            )));
        }

        for (name, value) in [
            ("maxSelected", self.max_selected),
            ("resultsPerQuery", self.results_per_query),
            ("maxQueries", self.max_queries),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be at least 1", name)));
            }
        }

        if self.generation_timeout_secs == 0 || self.retrieval_timeout_secs == 0 {
            return Err(AppError::Config(
                "Timeouts must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    index: Option<IndexSettings>,
    embedding: Option<EmbeddingSettings>,
    pipeline: Option<PipelineConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmFileSection {
    provider: Option<String>,
    model: Option<String>,
    #[serde(flatten)]
    settings: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: LlmSettings::default(),
            index: IndexSettings::default(),
            embedding: EmbeddingSettings::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `NEWSDESK_WORKSPACE`: Override workspace path
    /// - `NEWSDESK_CONFIG`: Path to config file
    /// - `NEWSDESK_PROVIDER`: Generation provider
    /// - `NEWSDESK_MODEL`: Default model identifier
    /// - `NEWSDESK_API_KEY`: Generation provider API key
    /// - `NEWSDESK_INDEX_HOST`: Vector index host
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use newsdesk_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("NEWSDESK_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("NEWSDESK_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.newsdesk_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("NEWSDESK_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("NEWSDESK_MODEL") {
            config.model = model;
        }

        if let Ok(host) = std::env::var("NEWSDESK_INDEX_HOST") {
            config.index.host = Some(host);
        }

        config.api_key = std::env::var("NEWSDESK_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            result.llm = llm.settings;
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .newsdesk directory.
    pub fn newsdesk_dir(&self) -> PathBuf {
        self.workspace.join(".newsdesk")
    }

    /// Model used for a given role, falling back to the default model.
    pub fn model_for(&self, role: ModelRole) -> &str {
        let specific = match role {
            ModelRole::Router => self.llm.router_model.as_deref(),
            ModelRole::Expander => self.llm.expander_model.as_deref(),
            ModelRole::Answer => self.llm.answer_model.as_deref(),
        };
        specific.unwrap_or(&self.model)
    }

    /// Resolve the vector index API key from its environment variable.
    pub fn resolve_index_api_key(&self) -> AppResult<String> {
        std::env::var(&self.index.api_key_env).map_err(|_| {
            AppError::Config(format!(
                "Index API key not found in environment variable: {}",
                self.index.api_key_env
            ))
        })
    }

    /// Validate configuration before a turn is run.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }

        self.pipeline.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.pipeline.relevance_threshold, 0.5);
        assert_eq!(config.pipeline.max_selected, 5);
        assert_eq!(config.pipeline.results_per_query, 5);
        assert_eq!(config.pipeline.max_queries, 3);
        assert_eq!(config.pipeline.history_window, 5);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_newsdesk_dir() {
        let config = AppConfig::default();
        assert!(config.newsdesk_dir().ends_with(".newsdesk"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("qwen2.5".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.model, "qwen2.5");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_model_for_role_falls_back_to_default() {
        let mut config = AppConfig::default();
        config.llm.router_model = Some("llama3.2:1b".to_string());

        assert_eq!(config.model_for(ModelRole::Router), "llama3.2:1b");
        assert_eq!(config.model_for(ModelRole::Expander), "llama3.2");
        assert_eq!(config.model_for(ModelRole::Answer), "llama3.2");
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: ollama
  model: mistral
  endpoint: http://gpu-box:11434
  answerModel: mistral-large
index:
  host: https://articles.svc.example.io
  defaultNamespace: news
pipeline:
  relevanceThreshold: 0.35
  maxSelected: 8
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.model, "mistral");
        assert_eq!(merged.llm.endpoint.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(merged.model_for(ModelRole::Answer), "mistral-large");
        assert_eq!(merged.model_for(ModelRole::Router), "mistral");
        assert_eq!(
            merged.index.host.as_deref(),
            Some("https://articles.svc.example.io")
        );
        assert_eq!(merged.index.api_key_env, "PINECONE_API_KEY");
        assert_eq!(merged.pipeline.relevance_threshold, 0.35);
        assert_eq!(merged.pipeline.max_selected, 8);
        // Unspecified pipeline fields keep their defaults
        assert_eq!(merged.pipeline.results_per_query, 5);
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_yaml_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "pipeline: [1, 2").unwrap();

        let result = AppConfig::default().merge_yaml(&path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_pipeline() {
        let mut pipeline = PipelineConfig::default();
        assert!(pipeline.validate().is_ok());

        pipeline.max_selected = 0;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.relevance_threshold = f32::NAN;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.retrieval_timeout_secs = 0;
        assert!(pipeline.validate().is_err());
    }
}
