//! Generation pipeline
//!
//! Research, analysis and writing run once; critique and editing repeat in a
//! bounded loop. Each stage reads only the upstream outputs it declares.

pub mod context;
pub mod executor;
pub mod orchestrator;
pub mod refinement;
pub mod runner;
pub mod stage;
pub mod termination;

// Re-export public types for convenience
pub use context::{ContextStore, StageContext};
pub use executor::{ExecutorSettings, StageExecutionError, StageExecutor, StageFailure, StageInput};
pub use orchestrator::{
    render_artifact, GeneratedPost, PipelineOrchestrator, PipelineSettings, RunMetadata, RunResult,
};
pub use refinement::{LoopState, RefinementLoop, RefinementOutcome, RefinementRecord, RunState};
pub use runner::{until_cancelled, StageRunner};
pub use stage::{Stage, StageResult};
pub use termination::{
    PhraseTermination, TerminationDecision, TerminationPolicy, TerminationReason, STOP_PHRASES,
};

// Re-export error types
pub use orchestrator::PipelineError;
