//! Per-run store of the latest output of each stage
//!
//! Stages never see each other directly. The orchestrator records every
//! result here and hands a stage only the slots it declares in
//! [`Stage::dependencies`].

use crate::pipeline::executor::{StageExecutionError, StageFailure};
use crate::pipeline::stage::{Stage, StageResult};
use std::collections::BTreeMap;

/// Context handed to a stage: dependency name to output text, in pipeline order
pub type StageContext = BTreeMap<Stage, String>;

/// Latest-wins mapping from stage to its current [`StageResult`]
#[derive(Debug, Default)]
pub struct ContextStore {
    slots: BTreeMap<Stage, StageResult>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` as the current output of `stage`, replacing any prior one
    pub fn put(&mut self, stage: Stage, text: impl Into<String>) {
        self.slots.insert(stage, StageResult::new(stage, text));
    }

    pub fn get(&self, stage: Stage) -> Option<&str> {
        self.slots.get(&stage).map(|r| r.raw_text.as_str())
    }

    pub fn result(&self, stage: Stage) -> Option<&StageResult> {
        self.slots.get(&stage)
    }

    /// Outputs for `stages`; missing entries are omitted
    pub fn get_many(&self, stages: &[Stage]) -> StageContext {
        stages
            .iter()
            .filter_map(|stage| self.get(*stage).map(|text| (*stage, text.to_string())))
            .collect()
    }

    /// The declared context for `stage`, failing if any dependency is absent
    pub fn context_for(&self, stage: Stage) -> Result<StageContext, StageExecutionError> {
        if let Some(missing) = stage
            .dependencies()
            .iter()
            .find(|dep| !self.slots.contains_key(*dep))
        {
            return Err(StageExecutionError::new(
                stage,
                StageFailure::MissingContext(*missing),
            ));
        }
        Ok(self.get_many(stage.dependencies()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
