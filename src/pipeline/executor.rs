//! Runs a single stage against the model
//!
//! The executor is stateless between calls: it builds the prompt from the
//! stage input, issues exactly one completion request and returns the text
//! as-is. Recording the result is the caller's job.

use crate::llm::{CompletionRequest, FinishReason, LlmError, LlmProvider};
use crate::pipeline::context::StageContext;
use crate::pipeline::stage::Stage;
use crate::prompts::PromptProvider;
use crate::search::{SearchError, SearchHit, SearchProvider};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default bound on a single stage call, search included
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Input for one stage execution
#[derive(Debug, Clone)]
pub struct StageInput {
    pub topic: String,
    /// Refinement iteration this call belongs to; 0 outside the loop
    pub iteration: u32,
    /// Declared upstream outputs only
    pub context: StageContext,
}

impl StageInput {
    pub fn new(topic: impl Into<String>, iteration: u32, context: StageContext) -> Self {
        Self {
            topic: topic.into(),
            iteration,
            context,
        }
    }
}

/// Why a stage failed
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("model call failed: {0}")]
    Inference(#[from] LlmError),
    #[error("web search failed: {0}")]
    Search(#[from] SearchError),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("model returned empty output")]
    EmptyOutput,
    #[error("missing upstream context from the {0} stage")]
    MissingContext(Stage),
}

/// A stage failed; fatal to the run
#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause}")]
pub struct StageExecutionError {
    pub stage: Stage,
    #[source]
    pub cause: StageFailure,
}

impl StageExecutionError {
    pub fn new(stage: Stage, cause: impl Into<StageFailure>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// Model and search parameters shared by every stage of a run
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stage_timeout: Duration,
    pub search_queries: usize,
    pub results_per_query: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            search_queries: 5,
            results_per_query: 5,
        }
    }
}

/// Executes stages through an [`LlmProvider`]
pub struct StageExecutor {
    llm: Arc<dyn LlmProvider>,
    search: Option<Arc<dyn SearchProvider>>,
    prompts: Arc<dyn PromptProvider>,
    settings: ExecutorSettings,
}

impl StageExecutor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        prompts: Arc<dyn PromptProvider>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            llm,
            search: None,
            prompts,
            settings,
        }
    }

    /// Attach the search provider used by the research stage
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run `stage` once. Returns the model's raw text, never empty.
    pub async fn execute(
        &self,
        stage: Stage,
        input: &StageInput,
    ) -> Result<String, StageExecutionError> {
        let timeout = self.settings.stage_timeout;

        let text = tokio::time::timeout(timeout, self.run_stage(stage, input))
            .await
            .map_err(|_| {
                warn!(stage = %stage, timeout_secs = timeout.as_secs(), "Stage timed out");
                StageExecutionError::new(stage, StageFailure::Timeout(timeout))
            })??;

        if text.trim().is_empty() {
            warn!(stage = %stage, "Stage produced empty output");
            return Err(StageExecutionError::new(stage, StageFailure::EmptyOutput));
        }

        debug!(stage = %stage, chars = text.len(), "Stage completed");
        Ok(text)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        input: &StageInput,
    ) -> Result<String, StageExecutionError> {
        let hits = if stage == Stage::Research {
            self.gather_sources(input)
                .await
                .map_err(|e| StageExecutionError::new(stage, e))?
        } else {
            Vec::new()
        };

        let mut request = CompletionRequest::new(
            self.settings.model.clone(),
            self.prompts.persona(stage),
            self.prompts.instruction(stage, input, &hits),
        );
        request.temperature = Some(self.settings.temperature);
        request.max_tokens = Some(self.settings.max_tokens);
        request
            .metadata
            .insert("stage".to_string(), stage.name().to_string());

        debug!(
            stage = %stage,
            provider = self.llm.name(),
            model = %self.settings.model,
            context_slots = input.context.len(),
            "Sending stage request"
        );

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| StageExecutionError::new(stage, e))?;

        debug!(
            stage = %stage,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Token usage"
        );
        if response.finish_reason == FinishReason::Length {
            warn!(stage = %stage, "Stage output truncated at max_tokens");
        }

        Ok(response.content.unwrap_or_default())
    }

    async fn gather_sources(&self, input: &StageInput) -> Result<Vec<SearchHit>, SearchError> {
        let Some(search) = &self.search else {
            warn!("No search provider configured, researching from model knowledge only");
            return Ok(Vec::new());
        };

        let hits = search
            .search_many(
                &input.topic,
                self.settings.search_queries,
                self.settings.results_per_query,
            )
            .await?;

        info!(
            provider = search.name(),
            queries = self.settings.search_queries,
            sources = hits.len(),
            "Collected research sources"
        );
        Ok(hits)
    }
}
