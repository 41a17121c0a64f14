//! Turn orchestration: route, then either answer directly or research and
//! answer from evidence.
//!
//! ```text
//! Received -> Routed -> DirectAnswer ---------------------------------> Done
//!                    \-> Expanded -> Retrieved -> Selected -> Answered -> Done
//! ```
//!
//! Only a failed answer generation fails the turn. Routing, expansion and
//! retrieval problems degrade to the research fallback, no queries, or fewer
//! chunks respectively.

use crate::answer::{AnswerBasis, AnswerComposer};
use crate::citations::link_citations;
use crate::expansion::{ExpandedQuery, QueryExpander};
use crate::generation::Generator;
use crate::guard::bounded;
use crate::index::PassageIndex;
use crate::retriever::{ParallelRetriever, RetrievalReport};
use crate::routing::{Route, Router, RoutingDecision};
use crate::selection::{select, SelectionPolicy};
use crate::types::{Chunk, Citation, Turn};
use futures::StreamExt;
use newsdesk_core::config::{AppConfig, ModelRole};
use newsdesk_core::{AppError, AppResult, PipelineConfig};
use newsdesk_llm::LlmClient;
use newsdesk_prompt::PromptSet;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Model used for each generation role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoles {
    pub router: String,
    pub expander: String,
    pub answer: String,
}

impl ModelRoles {
    /// Same model for every role.
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            router: model.clone(),
            expander: model.clone(),
            answer: model,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            router: config.model_for(ModelRole::Router).to_string(),
            expander: config.model_for(ModelRole::Expander).to_string(),
            answer: config.model_for(ModelRole::Answer).to_string(),
        }
    }
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub route: Route,
    pub reasoning: String,
    pub queries: Vec<String>,
    pub selection_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<RetrievalReport>,
}

/// Progress of a streamed turn, serialized as `{"event": ..., "data": {...}}`.
///
/// Every stream ends with exactly one of `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Start { turn_id: String },
    ResponseChunk { content: String },
    ResponseComplete { response: String },
    Complete { response: String, citations: Vec<Citation> },
    Error { error: String, message: String },
}

impl StreamEvent {
    pub fn from_error(err: &AppError) -> Self {
        let kind = match err {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Llm(_) => "generation",
            AppError::Retrieval(_) => "retrieval",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::Timeout(_) => "timeout",
            AppError::Cancelled(_) => "cancelled",
            AppError::Other(_) => "invalid_request",
        };
        StreamEvent::Error {
            error: kind.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

/// Everything decided before the answer is generated.
struct Plan {
    decision: RoutingDecision,
    queries: Vec<ExpandedQuery>,
    selection: Vec<Chunk>,
    report: Option<RetrievalReport>,
}

impl Plan {
    fn basis(&self) -> AnswerBasis<'_> {
        match self.decision.route {
            Route::ConductResearch => AnswerBasis::Grounded(&self.selection),
            Route::GeneralConversation | Route::AskMoreInfo => AnswerBasis::Direct(&self.decision),
        }
    }

    fn finish(self, answer: String) -> TurnOutcome {
        let citations = link_citations(&answer, &self.selection);
        TurnOutcome {
            answer,
            citations,
            route: self.decision.route,
            reasoning: self.decision.reasoning,
            queries: self.queries.into_iter().map(ExpandedQuery::into_inner).collect(),
            selection_size: self.selection.len(),
            retrieval: self.report,
        }
    }
}

fn ensure_live(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled("turn cancelled".to_string()));
    }
    Ok(())
}

async fn emit(sink: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> AppResult<()> {
    sink.send(event)
        .await
        .map_err(|_| AppError::Cancelled("stream receiver closed".to_string()))
}

/// The research assistant's per-turn pipeline.
///
/// Holds no per-turn state; one instance can serve concurrent turns.
#[derive(Clone)]
pub struct ResearchPipeline {
    router: Router,
    expander: QueryExpander,
    retriever: ParallelRetriever,
    composer: AnswerComposer,
    policy: SelectionPolicy,
    generation_timeout: Duration,
}

impl ResearchPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        index: Arc<dyn PassageIndex>,
        prompts: PromptSet,
        config: PipelineConfig,
        models: ModelRoles,
    ) -> AppResult<Self> {
        config.validate()?;

        let generation_timeout = Duration::from_secs(config.generation_timeout_secs);
        let generator = Generator::new(llm, Arc::new(prompts), generation_timeout);

        Ok(Self {
            router: Router::new(generator.clone(), models.router, config.history_window),
            expander: QueryExpander::new(
                generator.clone(),
                models.expander,
                config.max_queries,
                config.history_window,
            ),
            retriever: ParallelRetriever::new(
                index,
                config.results_per_query,
                Duration::from_secs(config.retrieval_timeout_secs),
            ),
            composer: AnswerComposer::new(generator, models.answer, config.history_window),
            policy: SelectionPolicy::from(&config),
            generation_timeout,
        })
    }

    /// Namespace searched when a turn carries no category.
    pub fn with_default_namespace(mut self, namespace: Option<String>) -> Self {
        self.retriever = self.retriever.with_default_namespace(namespace);
        self
    }

    /// Routing only.
    pub async fn route(&self, turn: &Turn) -> AppResult<RoutingDecision> {
        turn.validate()?;
        Ok(self.router.route(turn, &CancellationToken::new()).await)
    }

    /// Query expansion only.
    pub async fn expand(&self, turn: &Turn) -> AppResult<Vec<ExpandedQuery>> {
        turn.validate()?;
        Ok(self.expander.expand(turn, &CancellationToken::new()).await)
    }

    async fn plan(&self, turn: &Turn, cancel: &CancellationToken) -> AppResult<Plan> {
        turn.validate()?;

        let decision = self.router.route(turn, cancel).await;
        ensure_live(cancel)?;

        match decision.route {
            Route::GeneralConversation | Route::AskMoreInfo => Ok(Plan {
                decision,
                queries: Vec::new(),
                selection: Vec::new(),
                report: None,
            }),
            Route::ConductResearch => {
                let queries = self.expander.expand(turn, cancel).await;
                ensure_live(cancel)?;

                let (collection, report) = self
                    .retriever
                    .retrieve_all(&queries, turn.category, cancel)
                    .await;
                ensure_live(cancel)?;

                let selection = select(&collection, &self.policy);
                tracing::info!(
                    candidates = collection.len(),
                    selected = selection.len(),
                    "Selected chunks"
                );

                Ok(Plan {
                    decision,
                    queries,
                    selection,
                    report: Some(report),
                })
            }
        }
    }

    /// Run a turn to completion.
    pub async fn run(&self, turn: &Turn) -> AppResult<TurnOutcome> {
        self.run_with_cancel(turn, &CancellationToken::new()).await
    }

    /// Run a turn that the caller may cancel.
    pub async fn run_with_cancel(
        &self,
        turn: &Turn,
        cancel: &CancellationToken,
    ) -> AppResult<TurnOutcome> {
        let span = tracing::info_span!("turn", turn_id = %Uuid::new_v4());

        async {
            let plan = self.plan(turn, cancel).await?;
            let answer = self.composer.compose(turn, plan.basis(), cancel).await?;
            let outcome = plan.finish(answer);

            tracing::info!(
                route = %outcome.route,
                citations = outcome.citations.len(),
                "Turn complete"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Run a turn, reporting progress on `sink`.
    ///
    /// Dropping the receiver cancels the turn. Failures are sent as a single
    /// `error` event and also returned.
    pub async fn run_streaming(
        &self,
        turn: &Turn,
        sink: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> AppResult<TurnOutcome> {
        let turn_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("turn", turn_id = %turn_id);

        let result = async {
            tokio::select! {
                result = self.stream_turn(turn, &sink, &cancel, turn_id.clone()) => result,
                _ = sink.closed() => {
                    cancel.cancel();
                    Err(AppError::Cancelled("stream receiver closed".to_string()))
                }
            }
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Streamed turn failed");
            let _ = sink.send(StreamEvent::from_error(e)).await;
        }

        result
    }

    async fn stream_turn(
        &self,
        turn: &Turn,
        sink: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
        turn_id: String,
    ) -> AppResult<TurnOutcome> {
        emit(sink, StreamEvent::Start { turn_id }).await?;

        let plan = self.plan(turn, cancel).await?;
        let mut stream = self
            .composer
            .compose_stream(turn, plan.basis(), cancel)
            .await?;

        let mut answer = String::new();
        loop {
            let next = bounded("answer chunk", self.generation_timeout, cancel, async {
                Ok(stream.next().await)
            })
            .await?;

            let Some(chunk) = next else { break };
            let chunk = chunk?;

            if !chunk.content.is_empty() {
                answer.push_str(&chunk.content);
                emit(sink, StreamEvent::ResponseChunk { content: chunk.content }).await?;
            }
            if chunk.done {
                break;
            }
        }

        emit(
            sink,
            StreamEvent::ResponseComplete {
                response: answer.clone(),
            },
        )
        .await?;

        let outcome = plan.finish(answer);
        emit(
            sink,
            StreamEvent::Complete {
                response: outcome.answer.clone(),
                citations: outcome.citations.clone(),
            },
        )
        .await?;

        tracing::info!(
            route = %outcome.route,
            citations = outcome.citations.len(),
            "Streamed turn complete"
        );
        Ok(outcome)
    }
}
