//! Progress notifications emitted while a run executes
//!
//! The orchestrator and refinement loop describe what they are doing through
//! [`ProgressSink::emit`]. Sinks are fire-and-forget: a sink that cannot
//! deliver an event logs and moves on, it never fails the run.

use crate::pipeline::stage::Stage;
use crate::pipeline::termination::TerminationReason;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod console;
pub use console::ConsoleReporter;

/// One progress notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ProgressKind,
}

impl ProgressEvent {
    pub fn new(run_id: Uuid, kind: ProgressKind) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressKind {
    RunStarted {
        topic: String,
        max_iterations: u32,
    },
    StageStarted {
        stage: Stage,
        iteration: u32,
    },
    StageCompleted {
        stage: Stage,
        iteration: u32,
        output: String,
    },
    IterationStarted {
        iteration: u32,
        max_iterations: u32,
    },
    CritiqueReceived {
        iteration: u32,
        critique: String,
    },
    QualityThresholdMet {
        iteration: u32,
    },
    DraftRevised {
        iteration: u32,
        draft: String,
    },
    RefinementCompleted {
        iterations_used: u32,
        reason: TerminationReason,
    },
    RunCompleted {
        location: String,
        duration_secs: f64,
    },
    RunFailed {
        stage: Option<Stage>,
        iteration: Option<u32>,
        error: String,
    },
    RunCancelled {
        stage: Option<Stage>,
    },
}

impl ProgressKind {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ProgressKind::RunStarted { .. } => "run_started",
            ProgressKind::StageStarted { .. } => "stage_started",
            ProgressKind::StageCompleted { .. } => "stage_completed",
            ProgressKind::IterationStarted { .. } => "iteration_started",
            ProgressKind::CritiqueReceived { .. } => "critique_received",
            ProgressKind::QualityThresholdMet { .. } => "quality_threshold_met",
            ProgressKind::DraftRevised { .. } => "draft_revised",
            ProgressKind::RefinementCompleted { .. } => "refinement_completed",
            ProgressKind::RunCompleted { .. } => "run_completed",
            ProgressKind::RunFailed { .. } => "run_failed",
            ProgressKind::RunCancelled { .. } => "run_cancelled",
        }
    }
}

/// Receives progress events
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

pub struct NoOpProgress;

#[async_trait]
impl ProgressSink for NoOpProgress {
    async fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards every event to `tracing`
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait]
impl ProgressSink for LogReporter {
    async fn emit(&self, event: ProgressEvent) {
        let run_id = event.run_id;
        match &event.kind {
            ProgressKind::RunFailed {
                stage,
                iteration,
                error,
            } => warn!(
                run_id = %run_id,
                stage = ?stage,
                iteration = ?iteration,
                error = %error,
                "Run failed"
            ),
            ProgressKind::RunCancelled { stage } => {
                warn!(run_id = %run_id, stage = ?stage, "Run cancelled")
            }
            ProgressKind::RunStarted { .. }
            | ProgressKind::RunCompleted { .. }
            | ProgressKind::RefinementCompleted { .. } => {
                info!(run_id = %run_id, event = event.kind.name(), details = ?event.kind, "Progress")
            }
            kind => debug!(run_id = %run_id, event = kind.name(), "Progress"),
        }
    }
}

/// Delivers each event to several sinks in order
#[derive(Default)]
pub struct ProgressFanout {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl ProgressFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl ProgressSink for ProgressFanout {
    async fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}
