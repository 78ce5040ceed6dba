//! Per-run wrapper around [`StageExecutor`]
//!
//! Adds what a single executor call does not know about: the run's id,
//! progress events around every stage, and cancellation both before a call
//! is issued and while it is in flight.

use crate::pipeline::executor::{StageExecutor, StageInput};
use crate::pipeline::orchestrator::PipelineError;
use crate::pipeline::stage::Stage;
use crate::progress::{ProgressEvent, ProgressKind, ProgressSink};
use crate::stage_span;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};
use uuid::Uuid;

pub struct StageRunner<'a> {
    executor: &'a StageExecutor,
    progress: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
    run_id: Uuid,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        executor: &'a StageExecutor,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationToken,
        run_id: Uuid,
    ) -> Self {
        Self {
            executor,
            progress,
            cancel,
            run_id,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub async fn emit(&self, kind: ProgressKind) {
        self.progress
            .emit(ProgressEvent::new(self.run_id, kind))
            .await;
    }

    pub fn ensure_not_cancelled(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            info!(run_id = %self.run_id, stage = %stage, "Cancellation observed before stage");
            return Err(PipelineError::Cancelled { stage: Some(stage) });
        }
        Ok(())
    }

    /// Execute `stage`, surrounded by start/complete events
    pub async fn run(&self, stage: Stage, input: &StageInput) -> Result<String, PipelineError> {
        self.ensure_not_cancelled(stage)?;

        let iteration = input.iteration;
        self.emit(ProgressKind::StageStarted { stage, iteration })
            .await;

        let span = stage_span!(run_id = %self.run_id, stage = %stage, iteration = iteration);
        let call = self.executor.execute(stage, input).instrument(span);

        let text = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(run_id = %self.run_id, stage = %stage, "Stage abandoned on cancellation");
                return Err(PipelineError::Cancelled { stage: Some(stage) });
            }
            result = call => result.map_err(|source| PipelineError::Stage { source, iteration })?,
        };

        self.emit(ProgressKind::StageCompleted {
            stage,
            iteration,
            output: text.clone(),
        })
        .await;

        Ok(text)
    }
}

/// Await `work` unless `cancel` fires first. Used for work that happens
/// before any stage starts, such as reading the topic.
pub async fn until_cancelled<F>(
    cancel: &CancellationToken,
    work: F,
) -> Result<F::Output, PipelineError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("Cancelled before the run started");
            Err(PipelineError::Cancelled { stage: None })
        }
        output = work => Ok(output),
    }
}
