//! Bounded critique/edit loop
//!
//! ```text
//! AwaitingCritique --critique--> Evaluating --stop--> Done
//!        ^                           |
//!        |                        continue (iteration += 1)
//!        |                           v
//!        +-----------edit--------- Editing
//! ```
//!
//! Stops when the termination policy accepts a critique or after
//! `max_iterations` edits, whichever comes first. Any stage failure aborts
//! the loop and the partial refinement is discarded.

use crate::iteration_span;
use crate::pipeline::context::ContextStore;
use crate::pipeline::executor::{StageExecutionError, StageFailure, StageInput};
use crate::pipeline::orchestrator::PipelineError;
use crate::pipeline::runner::StageRunner;
use crate::pipeline::stage::Stage;
use crate::pipeline::termination::{TerminationDecision, TerminationPolicy, TerminationReason};
use crate::progress::ProgressKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Instrument};

/// One critique round: the draft that was judged and what the critic said
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRecord {
    pub iteration: u32,
    pub critique: String,
    pub draft: String,
}

/// Working state of a single run
#[derive(Debug, Clone)]
pub struct RunState {
    pub topic: String,
    pub current_draft: String,
    pub iteration: u32,
    pub history: Vec<RefinementRecord>,
}

impl RunState {
    /// Seed from the writing stage's draft, which must not be blank
    pub fn seeded(
        topic: impl Into<String>,
        draft: impl Into<String>,
    ) -> Result<Self, StageExecutionError> {
        let current_draft = draft.into();
        if current_draft.trim().is_empty() {
            return Err(StageExecutionError::new(
                Stage::Writing,
                StageFailure::EmptyOutput,
            ));
        }
        Ok(Self {
            topic: topic.into(),
            current_draft,
            iteration: 0,
            history: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingCritique,
    Evaluating,
    Editing,
    Done,
}

/// What the loop produced
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutcome {
    pub final_draft: String,
    pub critiques: u32,
    pub edits: u32,
    pub stop_reason: TerminationReason,
    pub iterations_used: u32,
}

pub struct RefinementLoop<'a> {
    runner: &'a StageRunner<'a>,
    policy: &'a dyn TerminationPolicy,
    max_iterations: u32,
}

impl<'a> RefinementLoop<'a> {
    pub fn new(
        runner: &'a StageRunner<'a>,
        policy: &'a dyn TerminationPolicy,
        max_iterations: u32,
    ) -> Self {
        Self {
            runner,
            policy,
            max_iterations,
        }
    }

    /// Drive the loop to completion. `state.current_draft` holds the final draft on success.
    pub async fn run(
        &self,
        state: &mut RunState,
        store: &mut ContextStore,
    ) -> Result<RefinementOutcome, PipelineError> {
        let mut loop_state = LoopState::AwaitingCritique;
        let mut critique = String::new();
        let mut critiques = 0u32;
        let mut edits = 0u32;
        let mut stop_reason = TerminationReason::Continue;

        self.runner
            .emit(ProgressKind::IterationStarted {
                iteration: state.iteration,
                max_iterations: self.max_iterations,
            })
            .await;

        loop {
            match loop_state {
                LoopState::AwaitingCritique => {
                    let input = self.input_for(Stage::Critique, state, store)?;
                    critique = self
                        .runner
                        .run(Stage::Critique, &input)
                        .instrument(iteration_span!(iteration = state.iteration))
                        .await?;
                    critiques += 1;

                    store.put(Stage::Critique, critique.clone());
                    state.history.push(RefinementRecord {
                        iteration: state.iteration,
                        critique: critique.clone(),
                        draft: state.current_draft.clone(),
                    });
                    self.runner
                        .emit(ProgressKind::CritiqueReceived {
                            iteration: state.iteration,
                            critique: critique.clone(),
                        })
                        .await;

                    loop_state = LoopState::Evaluating;
                }
                LoopState::Evaluating => {
                    let decision = TerminationDecision::evaluate(
                        self.policy,
                        &critique,
                        state.iteration,
                        self.max_iterations,
                    );
                    debug!(
                        iteration = state.iteration,
                        reason = ?decision.reason,
                        "Termination decision"
                    );

                    if decision.should_stop {
                        if decision.reason == TerminationReason::QualityMet {
                            self.runner
                                .emit(ProgressKind::QualityThresholdMet {
                                    iteration: state.iteration,
                                })
                                .await;
                        }
                        stop_reason = decision.reason;
                        loop_state = LoopState::Done;
                    } else {
                        state.iteration += 1;
                        self.runner
                            .emit(ProgressKind::IterationStarted {
                                iteration: state.iteration,
                                max_iterations: self.max_iterations,
                            })
                            .await;
                        loop_state = LoopState::Editing;
                    }
                }
                LoopState::Editing => {
                    let input = self.input_for(Stage::Editing, state, store)?;
                    let revised = self
                        .runner
                        .run(Stage::Editing, &input)
                        .instrument(iteration_span!(iteration = state.iteration))
                        .await?;
                    edits += 1;

                    store.put(Stage::Editing, revised.clone());
                    state.current_draft = revised;
                    self.runner
                        .emit(ProgressKind::DraftRevised {
                            iteration: state.iteration,
                            draft: state.current_draft.clone(),
                        })
                        .await;

                    loop_state = LoopState::AwaitingCritique;
                }
                LoopState::Done => break,
            }
        }

        let iterations_used = critiques.min(self.max_iterations);
        info!(
            critiques,
            edits,
            iterations_used,
            reason = ?stop_reason,
            "Refinement finished"
        );
        self.runner
            .emit(ProgressKind::RefinementCompleted {
                iterations_used,
                reason: stop_reason,
            })
            .await;

        Ok(RefinementOutcome {
            final_draft: state.current_draft.clone(),
            critiques,
            edits,
            stop_reason,
            iterations_used,
        })
    }

    /// Declared context for `stage`, with the draft under refinement in the writing slot
    fn input_for(
        &self,
        stage: Stage,
        state: &RunState,
        store: &ContextStore,
    ) -> Result<StageInput, PipelineError> {
        let mut context = store.get_many(stage.dependencies());
        context.insert(Stage::Writing, state.current_draft.clone());

        if let Some(missing) = stage
            .dependencies()
            .iter()
            .find(|dep| !context.contains_key(*dep))
        {
            return Err(PipelineError::Stage {
                source: StageExecutionError::new(stage, StageFailure::MissingContext(*missing)),
                iteration: state.iteration,
            });
        }

        Ok(StageInput::new(state.topic.clone(), state.iteration, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rejects_blank_draft() {
        let err = RunState::seeded("Rust", "  \n").unwrap_err();
        assert_eq!(err.stage, Stage::Writing);
        assert!(matches!(err.cause, StageFailure::EmptyOutput));
    }

    #[test]
    fn test_seeded_starts_at_iteration_zero() {
        let state = RunState::seeded("Rust", "draft").unwrap();
        assert_eq!(state.iteration, 0);
        assert!(state.history.is_empty());
        assert_eq!(state.current_draft, "draft");
    }
}
