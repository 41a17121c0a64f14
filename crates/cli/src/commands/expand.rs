//! Expand command handler: show the search queries a turn would produce.

use super::runtime::{build_pipeline, TurnArgs};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppError, AppResult};

/// Print the retrieval queries generated for a message
#[derive(Args, Debug)]
pub struct ExpandCommand {
    #[command(flatten)]
    pub turn: TurnArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ExpandCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let turn = self.turn.to_turn()?;
        let queries = build_pipeline(config)?.expand(&turn).await?;

        if queries.is_empty() {
            tracing::warn!("No valid queries were produced");
        }

        if self.json {
            let json = serde_json::to_string_pretty(&queries)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            for query in &queries {
                println!("{}", query);
            }
        }
        Ok(())
    }
}
