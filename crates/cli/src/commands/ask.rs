//! Ask command handler.
//!
//! Runs a full turn: routing, research when needed, and a cited answer.

use super::runtime::{build_pipeline, TurnArgs};
use clap::Args;
use newsdesk_core::{config::AppConfig, AppError, AppResult};
use newsdesk_research::{Citation, ResearchPipeline, StreamEvent, Turn, TurnOutcome};
use std::io::Write;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Ask the news assistant a question
#[derive(Args, Debug)]
pub struct AskCommand {
    #[command(flatten)]
    pub turn: TurnArgs,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON (NDJSON events when streaming)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let turn = self.turn.to_turn()?;
        let pipeline = build_pipeline(config)?;

        // Ctrl-C cancels the turn
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        if self.no_stream {
            self.handle_non_streaming(&pipeline, &turn, &cancel).await
        } else {
            self.handle_streaming(&pipeline, &turn, cancel).await
        }
    }

    /// Handle non-streaming response.
    async fn handle_non_streaming(
        &self,
        pipeline: &ResearchPipeline,
        turn: &Turn,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let outcome = pipeline.run_with_cancel(turn, cancel).await?;

        if self.json {
            println!("{}", render_json(&outcome)?);
        } else {
            println!("{}", outcome.answer);
            print_sources(&outcome.citations);
        }

        Ok(())
    }

    /// Handle streaming response.
    async fn handle_streaming(
        &self,
        pipeline: &ResearchPipeline,
        turn: &Turn,
        cancel: CancellationToken,
    ) -> AppResult<()> {
        let (tx, mut rx) = mpsc::channel(64);

        let json = self.json;
        let printer = async move {
            let mut citations = Vec::new();
            while let Some(event) = rx.recv().await {
                if json {
                    // One event per line
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => tracing::warn!(error = %e, "Failed to encode stream event"),
                    }
                    continue;
                }
                match event {
                    StreamEvent::Start { turn_id } => tracing::debug!(%turn_id, "Turn started"),
                    StreamEvent::ResponseChunk { content } => {
                        print!("{}", content);
                        std::io::stdout().flush().ok();
                    }
                    StreamEvent::ResponseComplete { .. } => println!(),
                    StreamEvent::Complete { citations: linked, .. } => citations = linked,
                    StreamEvent::Error { error, message } => {
                        tracing::debug!(%error, %message, "Turn ended with error event");
                    }
                }
            }
            citations
        };

        let (result, citations) = tokio::join!(pipeline.run_streaming(turn, tx, cancel), printer);
        result?;

        if !self.json {
            print_sources(&citations);
        }
        Ok(())
    }
}

fn render_json(outcome: &TurnOutcome) -> AppResult<String> {
    let output = serde_json::json!({
        "answer": outcome.answer,
        "citations": outcome.citations,
        "metadata": {
            "route": outcome.route,
            "reasoning": outcome.reasoning,
            "queries": outcome.queries,
            "selectionSize": outcome.selection_size,
            "retrieval": outcome.retrieval,
        }
    });

    serde_json::to_string_pretty(&output).map_err(|e| AppError::Serialization(e.to_string()))
}

fn print_sources(citations: &[Citation]) {
    if citations.is_empty() {
        return;
    }

    println!();
    println!("Sources:");
    for citation in citations {
        let byline = if citation.authors.is_empty() {
            citation.source.clone()
        } else {
            format!("{}, {}", citation.source, citation.authors.join(", "))
        };
        println!(
            "  [{}] {} ({}; {})",
            citation.article_id, citation.title, byline, citation.published_date
        );
        println!("      {}", citation.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_research::Route;

    #[test]
    fn test_render_json_contract() {
        let outcome = TurnOutcome {
            answer: "Rates rose [[art_1]].".to_string(),
            citations: vec![Citation {
                article_id: "art_1".to_string(),
                title: "Rates".to_string(),
                url: "https://example.com/1".to_string(),
                source: "Wire".to_string(),
                authors: vec![],
                published_date: "2025-01-01".to_string(),
            }],
            route: Route::ConductResearch,
            reasoning: "news question".to_string(),
            queries: vec!["central bank raises interest rates again".to_string()],
            selection_size: 1,
            retrieval: None,
        };

        let value: serde_json::Value = serde_json::from_str(&render_json(&outcome).unwrap()).unwrap();
        assert_eq!(value["answer"], "Rates rose [[art_1]].");
        assert_eq!(value["citations"][0]["article_id"], "art_1");
        assert_eq!(value["metadata"]["route"], "conduct_research");
        assert!(value["metadata"]["retrieval"].is_null());
    }
}
