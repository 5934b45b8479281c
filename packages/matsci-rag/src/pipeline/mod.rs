//! Query pipeline - the core of the library.
//!
//! The pipeline walks a fixed graph of stages:
//! - Summarize the question against the conversation history
//! - Classify which stored attributes are relevant
//! - Short-circuit to a clarification when none are
//! - Rewrite the search query with attribute vocabulary
//! - Scope retrieval by identifier or by a learned top-k
//! - Retrieve contexts and stream the final answer
//!
//! Each stage returns a [`StateUpdate`]; the pipeline applies it and asks the
//! stage for the next edge.

pub mod prompts;
pub mod responses;
pub mod stage;

pub use responses::{clamp_data_points, parse_related_attributes, parse_required_data_points};
pub use stage::{has_sufficient_context, Stage};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RagError, Result};
use crate::ids::{extract_ids, source_link};
use crate::reporter::{NoopReporter, ProgressReporter, ThoughtTrace, TraceReporter, TraceState};
use crate::sink::{NullSink, OutputSink};
use crate::state::{ChatMessage, ConversationState, StateUpdate};
use crate::traits::{gateway::Gateway, retriever::Retriever};
use crate::types::config::PipelineConfig;

/// Collaborators for one run that are not part of the pipeline itself.
pub struct RunContext<'a> {
    pub reporter: &'a dyn ProgressReporter,
    pub sink: &'a dyn OutputSink,
    pub cancel: CancellationToken,
}

impl<'a> RunContext<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter, sink: &'a dyn OutputSink) -> Self {
        Self {
            reporter,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for RunContext<'static> {
    fn default() -> Self {
        Self::new(&NoopReporter, &NullSink)
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub state: ConversationState,
    /// Stages in the order they ran.
    pub visited: Vec<Stage>,
}

impl PipelineRun {
    /// The generated answer.
    pub fn output(&self) -> &str {
        self.state.output().unwrap_or_default()
    }
}

/// Answer plus the trace that produced it.
#[derive(Debug, Clone)]
pub struct Answer {
    pub output: String,
    pub trace: ThoughtTrace,
    pub visited: Vec<Stage>,
}

/// The query pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::new(gateway, retriever);
///
/// let answer = pipeline.ask("What is the band gap of mp-149?", vec![]).await?;
/// println!("{}", answer.output);
/// ```
pub struct Pipeline<G: Gateway, R: Retriever> {
    gateway: G,
    retriever: R,
    config: PipelineConfig,
}

impl<G: Gateway, R: Retriever> Pipeline<G, R> {
    /// Create a new pipeline with default configuration.
    pub fn new(gateway: G, retriever: R) -> Self {
        Self {
            gateway,
            retriever,
            config: PipelineConfig::default(),
        }
    }

    /// Create a new pipeline with custom configuration.
    pub fn with_config(gateway: G, retriever: R, config: PipelineConfig) -> Self {
        Self {
            gateway,
            retriever,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Answer `query` and return the output with its thought trace.
    pub async fn ask(&self, query: &str, history: Vec<ChatMessage>) -> Result<Answer> {
        let reporter = TraceReporter::new();
        let ctx = RunContext::new(&reporter, &NullSink);
        let run = self.run(ConversationState::new(query, history), &ctx).await?;

        Ok(Answer {
            output: run.output().to_string(),
            trace: reporter.extract_trace(),
            visited: run.visited,
        })
    }

    /// Walk the stage graph from the entry stage to the terminal one.
    ///
    /// On failure the partial state is dropped, the trace is marked as
    /// errored and the error is returned.
    pub async fn run(&self, mut state: ConversationState, ctx: &RunContext<'_>) -> Result<PipelineRun> {
        let mut visited = Vec::new();
        let mut stage = Some(Stage::ENTRY);

        ctx.reporter
            .update(Some("**Analyzing user query**"), Some(true), Some(TraceState::Running));

        while let Some(current) = stage {
            if ctx.cancel.is_cancelled() {
                return Err(self.fail(ctx, current, RagError::Cancelled));
            }

            ctx.reporter.update(Some(current.label()), None, None);
            debug!(stage = %current, "Running pipeline stage");

            let update = match self.dispatch(current, &state, ctx).await {
                Ok(update) => update,
                Err(e) => return Err(self.fail(ctx, current, e)),
            };
            state
                .apply(update)
                .map_err(|e| self.fail(ctx, current, e))?;
            visited.push(current);

            if current == Stage::RelatedAttributes {
                report_context_decision(ctx.reporter, &state);
            }

            stage = current.next(&state);
        }

        ctx.reporter.update(None, None, Some(TraceState::Complete));
        info!(
            stages = visited.len(),
            retrieved = state.contexts().map(|c| c.len()).unwrap_or(0),
            "Pipeline run complete"
        );

        Ok(PipelineRun { state, visited })
    }

    fn fail(&self, ctx: &RunContext<'_>, stage: Stage, error: RagError) -> RagError {
        warn!(stage = %stage, error = %error, "Pipeline stage failed");
        ctx.reporter
            .write(&format!("{} failed: {}", stage.label(), error));
        ctx.reporter.update(None, None, Some(TraceState::Error));
        error
    }

    async fn dispatch(
        &self,
        stage: Stage,
        state: &ConversationState,
        ctx: &RunContext<'_>,
    ) -> Result<StateUpdate> {
        match stage {
            Stage::Summarize => self.summarize(state, ctx.reporter).await,
            Stage::RelatedAttributes => self.related_attributes(state, ctx.reporter).await,
            Stage::SearchQuery => self.search_query(state, ctx.reporter).await,
            Stage::ResultsLimit => self.results_limit(state, ctx.reporter).await,
            Stage::RetrieveContext => self.retrieve_context(state, ctx.reporter).await,
            Stage::FinalResponse => self.final_response(state, ctx).await,
        }
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn summarize(&self, state: &ConversationState, reporter: &dyn ProgressReporter) -> Result<StateUpdate> {
        let label = Stage::Summarize.label();

        if self.config.passthrough_summary {
            reporter.write(&format!(
                "{} Summary passthrough enabled, using the question as asked",
                label
            ));
            return Ok(StateUpdate::Summary(state.query().to_string()));
        }

        let prompt = prompts::format_summarize_prompt(state.query(), state.chat_history());
        let summary = self
            .gateway
            .complete_text(&prompt, self.config.summarize_temperature)
            .await?;
        let summary = summary.trim();

        if summary.is_empty() {
            reporter.write(&format!(
                "{} Model returned an empty summary, using the question as asked",
                label
            ));
            return Ok(StateUpdate::Summary(state.query().to_string()));
        }

        reporter.write(&format!("{} Conversation summary \"{}\"", label, summary));
        Ok(StateUpdate::Summary(summary.to_string()))
    }

    async fn related_attributes(
        &self,
        state: &ConversationState,
        reporter: &dyn ProgressReporter,
    ) -> Result<StateUpdate> {
        let label = Stage::RelatedAttributes.label();
        let prompt = prompts::format_related_attributes_prompt(state.effective_question());

        let attributes = match self
            .gateway
            .complete_json(&prompt, self.config.attributes_temperature)
            .await
        {
            Ok(value) => parse_related_attributes(&value),
            Err(RagError::JsonParse(e)) => {
                warn!(error = %e, "Attribute classifier returned malformed JSON");
                reporter.write(&format!(
                    "{} Could not read the classifier response, treating it as no relevant attributes",
                    label
                ));
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        reporter.write(&format!(
            "{} {:?} have been found to be relevant to the question",
            label, attributes
        ));
        Ok(StateUpdate::RelatedAttributes(attributes))
    }

    async fn search_query(&self, state: &ConversationState, reporter: &dyn ProgressReporter) -> Result<StateUpdate> {
        let label = Stage::SearchQuery.label();
        let summary = state.effective_question();

        if self.config.passthrough_search_query {
            reporter.write(&format!(
                "{} Search query passthrough enabled, searching with the summary",
                label
            ));
            return Ok(StateUpdate::SearchQuery(summary.to_string()));
        }

        let attributes = state.related_attributes().unwrap_or_default();
        let prompt = prompts::format_search_query_prompt(summary, attributes);
        let query = self
            .gateway
            .complete_text(&prompt, self.config.search_query_temperature)
            .await?;
        let query = query.trim();

        if query.is_empty() {
            reporter.write(&format!(
                "{} Model returned an empty search query, searching with the summary",
                label
            ));
            return Ok(StateUpdate::SearchQuery(summary.to_string()));
        }

        reporter.write(&format!("{} Refactored search query \"{}\"", label, query));
        Ok(StateUpdate::SearchQuery(query.to_string()))
    }

    async fn results_limit(&self, state: &ConversationState, reporter: &dyn ProgressReporter) -> Result<StateUpdate> {
        let label = Stage::ResultsLimit.label();
        let summary = state.effective_question();

        // Identifiers in the summary take priority over the numeric limit
        let ids = extract_ids(summary);
        if !ids.is_empty() {
            reporter.write(&format!(
                "{} Found material IDs {:?}, retrieving those records",
                label, ids
            ));
            return Ok(StateUpdate::MaterialIds(ids));
        }

        let prompt = prompts::format_results_limit_prompt(summary, self.config.max_data_points);
        let proposed = match self
            .gateway
            .complete_json(&prompt, self.config.results_limit_temperature)
            .await
        {
            Ok(value) => parse_required_data_points(&value),
            Err(RagError::JsonParse(e)) => {
                warn!(error = %e, "Results limit returned malformed JSON");
                0
            }
            Err(e) => return Err(e),
        };
        let k = clamp_data_points(proposed, self.config.max_data_points);

        reporter.write(&format!(
            "{} Decided to limit data points to k={}",
            label, k
        ));
        Ok(StateUpdate::RequiredDataPoints(k))
    }

    async fn retrieve_context(
        &self,
        state: &ConversationState,
        reporter: &dyn ProgressReporter,
    ) -> Result<StateUpdate> {
        let label = Stage::RetrieveContext.label();

        let contexts = match (state.material_ids(), state.required_data_points()) {
            (Some(ids), _) => {
                self.retriever
                    .search_by_ids(ids, self.config.id_scoped_limit)
                    .await?
            }
            (None, Some(k)) => {
                let query = state.search_query().unwrap_or(state.effective_question());
                self.retriever.search(query, k).await?
            }
            (None, None) => {
                return Err(RagError::invalid_input(
                    "retrieval scope was never decided",
                ))
            }
        };

        reporter.write(&format!(
            "{} Found {} reference documents:",
            label,
            contexts.len()
        ));
        for (index, context) in contexts.iter().enumerate() {
            let source = source_link(context, &self.config.source_base_url)
                .unwrap_or_else(|| "source information missing".to_string());
            reporter.write(&format!("[{}] [{}]: {}", index + 1, source, context));
        }

        Ok(StateUpdate::Contexts(contexts))
    }

    async fn final_response(&self, state: &ConversationState, ctx: &RunContext<'_>) -> Result<StateUpdate> {
        let label = Stage::FinalResponse.label();
        let summary = state.effective_question();

        let prompt = match state.contexts() {
            Some(contexts) if !contexts.is_empty() => prompts::format_answer_prompt(summary, contexts),
            _ => prompts::format_clarify_prompt(summary),
        };

        let mut stream = self
            .gateway
            .stream_text(&prompt, self.config.final_response_temperature)
            .await?;

        let mut output = String::new();
        loop {
            if ctx.cancel.is_cancelled() {
                return Err(RagError::Cancelled);
            }
            let Some(fragment) = stream.next().await else {
                break;
            };
            output.push_str(&fragment?);

            if !ctx.sink.partial(&output).await {
                debug!(received = output.len(), "Output consumer disconnected");
                return Err(RagError::Cancelled);
            }
        }

        let template = if state.contexts().map(|c| c.is_empty()).unwrap_or(true) {
            "clarification request"
        } else {
            "retrieved context"
        };
        ctx.reporter.write(&format!(
            "{} Generated final response based on {}",
            label, template
        ));
        Ok(StateUpdate::Output(output))
    }
}

fn report_context_decision(reporter: &dyn ProgressReporter, state: &ConversationState) {
    let label = "**Step: Determining whether the knowledge base has sufficient context or not**";
    reporter.update(Some(label), None, None);
    if has_sufficient_context(state) {
        reporter.write(&format!(
            "{} Knowledge base may have some contexts: continuing the retrieval process",
            label
        ));
    } else {
        reporter.write(&format!(
            "{} Knowledge base does not have sufficient context to proceed: skipping the retrieval process",
            label
        ));
    }
}
