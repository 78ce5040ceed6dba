//! Top-level driver for a generation run
//!
//! Runs research, analysis and writing once each, hands the draft to the
//! [`RefinementLoop`], renders the artifact and saves it exactly once.
//! Fail-fast throughout: the first error ends the run and nothing is saved,
//! except that a failed save still hands the generated post back.

use crate::output::{ArtifactLocation, ArtifactStore, PersistenceError};
use crate::pipeline::context::ContextStore;
use crate::pipeline::executor::{StageExecutionError, StageExecutor, StageInput};
use crate::pipeline::refinement::{RefinementLoop, RefinementRecord, RunState};
use crate::pipeline::runner::StageRunner;
use crate::pipeline::stage::Stage;
use crate::pipeline::termination::{PhraseTermination, TerminationPolicy};
use crate::progress::{ProgressEvent, ProgressKind, ProgressSink};
use crate::run_span;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

const BANNER_WIDTH: usize = 70;

/// Stages that run once, in order, before refinement
const LINEAR_STAGES: [Stage; 3] = [Stage::Research, Stage::Analysis, Stage::Writing];

/// Run-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_iterations: u32,
    /// Recorded in metadata only
    pub model: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            model: "claude-sonnet-4-5-20250929".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub topic: String,
    pub generated_at: DateTime<Local>,
    pub duration: Duration,
    pub iterations_used: u32,
    pub model: String,
}

/// Everything a run generated, whether or not it was saved
#[derive(Debug, Clone)]
pub struct GeneratedPost {
    pub run_id: Uuid,
    /// Final post text
    pub artifact: String,
    /// Artifact plus metadata in the persisted layout
    pub rendered: String,
    pub metadata: RunMetadata,
    pub history: Vec<RefinementRecord>,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub artifact: String,
    pub metadata: RunMetadata,
    pub location: ArtifactLocation,
    pub history: Vec<RefinementRecord>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Topic must not be empty")]
    InvalidTopic,

    #[error("{source} (iteration {iteration})")]
    Stage {
        #[source]
        source: StageExecutionError,
        iteration: u32,
    },

    #[error("Generation cancelled")]
    Cancelled { stage: Option<Stage> },

    #[error("Post generated but not saved: {source}")]
    Persistence {
        #[source]
        source: PersistenceError,
        post: Box<GeneratedPost>,
    },
}

impl PipelineError {
    /// The stage the run was in when it failed, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { source, .. } => Some(source.stage),
            PipelineError::Cancelled { stage } => *stage,
            PipelineError::InvalidTopic | PipelineError::Persistence { .. } => None,
        }
    }

    pub fn iteration(&self) -> Option<u32> {
        match self {
            PipelineError::Stage { iteration, .. } => Some(*iteration),
            _ => None,
        }
    }
}

/// Metadata block of the persisted artifact. Field order is the output order.
#[derive(Serialize)]
struct ArtifactMetadata<'a> {
    #[serde(rename = "Topic")]
    topic: &'a str,
    #[serde(rename = "Generated At")]
    generated_at: String,
    #[serde(rename = "Duration")]
    duration: String,
    #[serde(rename = "Iterations")]
    iterations: u32,
    #[serde(rename = "Model")]
    model: &'a str,
}

/// Render the persisted text layout for `post`
pub fn render_artifact(post: &str, metadata: &RunMetadata) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let block = ArtifactMetadata {
        topic: &metadata.topic,
        generated_at: metadata.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        duration: format!("{:.1} seconds", metadata.duration.as_secs_f64()),
        iterations: metadata.iterations_used,
        model: &metadata.model,
    };
    let metadata_json = serde_json::to_string_pretty(&block).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize artifact metadata");
        "{}".to_string()
    });

    format!(
        "{banner}\nLINKEDIN POST\n{banner}\n\n{post}\n\n{banner}\nMETADATA\n{banner}\n\n{metadata_json}\n"
    )
}

pub struct PipelineOrchestrator {
    settings: PipelineSettings,
    executor: StageExecutor,
    progress: Arc<dyn ProgressSink>,
    artifacts: Arc<dyn ArtifactStore>,
    policy: Arc<dyn TerminationPolicy>,
    cancel: CancellationToken,
}

impl PipelineOrchestrator {
    pub fn new(
        settings: PipelineSettings,
        executor: StageExecutor,
        progress: Arc<dyn ProgressSink>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            settings,
            executor,
            progress,
            artifacts,
            policy: Arc::new(PhraseTermination),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_termination_policy(mut self, policy: Arc<dyn TerminationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Cancelling `token` stops the run at the next stage boundary or in-flight call
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Generate, refine and save a post about `topic`
    pub async fn run(&self, topic: &str) -> Result<RunResult, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::InvalidTopic);
        }

        let run_id = Uuid::new_v4();
        let span = run_span!(run_id = %run_id, topic = %topic);

        let result = self.run_inner(run_id, topic).instrument(span).await;

        if let Err(e) = &result {
            let kind = match e {
                PipelineError::Cancelled { stage } => {
                    warn!(run_id = %run_id, stage = ?stage, "Run cancelled");
                    ProgressKind::RunCancelled { stage: *stage }
                }
                other => {
                    error!(run_id = %run_id, error = %other, "Run failed");
                    ProgressKind::RunFailed {
                        stage: other.stage(),
                        iteration: other.iteration(),
                        error: other.to_string(),
                    }
                }
            };
            self.progress.emit(ProgressEvent::new(run_id, kind)).await;
        }

        result
    }

    async fn run_inner(&self, run_id: Uuid, topic: &str) -> Result<RunResult, PipelineError> {
        let runner = StageRunner::new(&self.executor, self.progress.as_ref(), &self.cancel, run_id);
        runner
            .emit(ProgressKind::RunStarted {
                topic: topic.to_string(),
                max_iterations: self.settings.max_iterations,
            })
            .await;
        info!(
            max_iterations = self.settings.max_iterations,
            "Starting generation run"
        );

        let started = Instant::now();
        let mut store = ContextStore::new();

        for stage in LINEAR_STAGES {
            let context = store
                .context_for(stage)
                .map_err(|source| PipelineError::Stage {
                    source,
                    iteration: 0,
                })?;
            let text = runner
                .run(stage, &StageInput::new(topic, 0, context))
                .await?;
            store.put(stage, text);
        }

        let draft = store.get(Stage::Writing).unwrap_or_default();
        let mut state =
            RunState::seeded(topic, draft).map_err(|source| PipelineError::Stage {
                source,
                iteration: 0,
            })?;

        let outcome = RefinementLoop::new(&runner, self.policy.as_ref(), self.settings.max_iterations)
            .run(&mut state, &mut store)
            .await?;

        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled { stage: None });
        }

        let metadata = RunMetadata {
            topic: topic.to_string(),
            generated_at: Local::now(),
            duration: started.elapsed(),
            iterations_used: outcome.iterations_used,
            model: self.settings.model.clone(),
        };
        let rendered = render_artifact(&outcome.final_draft, &metadata);

        let location = match self.artifacts.save(&rendered).await {
            Ok(location) => location,
            Err(source) => {
                return Err(PipelineError::Persistence {
                    source,
                    post: Box::new(GeneratedPost {
                        run_id,
                        artifact: outcome.final_draft,
                        rendered,
                        metadata,
                        history: state.history,
                    }),
                });
            }
        };

        runner
            .emit(ProgressKind::RunCompleted {
                location: location.to_string(),
                duration_secs: metadata.duration.as_secs_f64(),
            })
            .await;
        info!(
            location = %location,
            duration_secs = metadata.duration.as_secs_f64(),
            iterations_used = metadata.iterations_used,
            "Generation run completed"
        );

        Ok(RunResult {
            run_id,
            artifact: outcome.final_draft,
            metadata,
            location,
            history: state.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata() -> RunMetadata {
        RunMetadata {
            topic: "Edge computing".to_string(),
            generated_at: Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
            duration: Duration::from_millis(42_349),
            iterations_used: 2,
            model: "claude-sonnet-4-5-20250929".to_string(),
        }
    }

    #[test]
    fn test_render_artifact_layout() {
        let rendered = render_artifact("Edge is here.\n\n#EdgeComputing", &metadata());
        let banner = "=".repeat(70);
        let expected = format!(
            "{banner}\nLINKEDIN POST\n{banner}\n\nEdge is here.\n\n#EdgeComputing\n\n\
             {banner}\nMETADATA\n{banner}\n\n\
             {{\n  \"Topic\": \"Edge computing\",\n  \"Generated At\": \"2025-03-14 09:26:53\",\n  \
             \"Duration\": \"42.3 seconds\",\n  \"Iterations\": 2,\n  \
             \"Model\": \"claude-sonnet-4-5-20250929\"\n}}\n"
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_error_stage_accessors() {
        let err = PipelineError::Stage {
            source: StageExecutionError::new(
                Stage::Critique,
                crate::pipeline::executor::StageFailure::EmptyOutput,
            ),
            iteration: 2,
        };
        assert_eq!(err.stage(), Some(Stage::Critique));
        assert_eq!(err.iteration(), Some(2));
        assert_eq!(
            err.to_string(),
            "critique stage failed: model returned empty output (iteration 2)"
        );

        assert_eq!(PipelineError::InvalidTopic.stage(), None);
    }
}
