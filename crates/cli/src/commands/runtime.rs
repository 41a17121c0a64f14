//! Pipeline construction and turn input shared by the commands.

use anyhow::Context;
use clap::Args;
use newsdesk_core::config::AppConfig;
use newsdesk_core::{AppError, AppResult};
use newsdesk_llm::create_client;
use newsdesk_prompt::PromptSet;
use newsdesk_research::embeddings::OllamaEmbedder;
use newsdesk_research::index::PineconeIndex;
use newsdesk_research::{Category, ChatMessage, ModelRoles, ResearchPipeline, Turn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Turn input accepted by every command.
#[derive(Args, Debug)]
pub struct TurnArgs {
    /// The user's message
    pub query: String,

    /// Restrict retrieval to one category (news, sports, economy, ...)
    #[arg(long)]
    pub category: Option<Category>,

    /// JSON file with prior messages: [{"role": "user", "content": "..."}]
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,
}

impl TurnArgs {
    pub fn to_turn(&self) -> AppResult<Turn> {
        let history = match &self.history {
            Some(path) => read_history(path).map_err(|e| AppError::Config(format!("{:#}", e)))?,
            None => Vec::new(),
        };

        let mut turn = Turn::new(self.query.clone()).with_history(history);
        if let Some(category) = self.category {
            turn = turn.with_category(category);
        }
        turn.validate()?;
        Ok(turn)
    }
}

fn read_history(path: &Path) -> anyhow::Result<Vec<ChatMessage>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {:?}", path))?;
    let history = serde_json::from_str(&contents)
        .with_context(|| format!("History file {:?} is not a list of messages", path))?;
    Ok(history)
}

/// Build the pipeline from configuration.
pub fn build_pipeline(config: &AppConfig) -> AppResult<ResearchPipeline> {
    config.validate()?;

    let llm = create_client(
        &config.provider,
        config.llm.endpoint.as_deref(),
        config.api_key.as_deref(),
    )
    .map_err(AppError::Config)?;

    let host = config.index.host.clone().ok_or_else(|| {
        AppError::Config(
            "No index host configured. Set NEWSDESK_INDEX_HOST or index.host in config.yaml"
                .to_string(),
        )
    })?;

    let embedder = OllamaEmbedder::new(
        config.embedding.endpoint.clone(),
        config.embedding.model.clone(),
        config.embedding.dimensions,
    )?;
    let index = PineconeIndex::new(host, config.resolve_index_api_key()?, Arc::new(embedder));

    let prompts = PromptSet::load(&config.workspace)?;

    tracing::debug!(
        provider = %config.provider,
        embedding_model = %config.embedding.model,
        "Building research pipeline"
    );

    Ok(ResearchPipeline::new(
        llm,
        Arc::new(index),
        prompts,
        config.pipeline.clone(),
        ModelRoles::from_config(config),
    )?
    .with_default_namespace(config.index.default_namespace.clone()))
}
