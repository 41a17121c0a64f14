//! Route command handler: show how a turn would be handled.

use super::runtime::{build_pipeline, TurnArgs};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppError, AppResult};

/// Classify a message without answering it
#[derive(Args, Debug)]
pub struct RouteCommand {
    #[command(flatten)]
    pub turn: TurnArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RouteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let turn = self.turn.to_turn()?;
        let decision = build_pipeline(config)?.route(&turn).await?;

        if self.json {
            let json = serde_json::to_string_pretty(&decision)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}: {}", decision.route, decision.reasoning);
        }
        Ok(())
    }
}
