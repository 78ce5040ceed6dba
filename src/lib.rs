//! postcrew - multi-stage LLM post generation
//!
//! A topic goes through research, analysis and writing, then a bounded
//! critique/edit loop that stops once a critique signals the post is ready or
//! the iteration budget runs out. The result is saved as a plain-text artifact
//! with run metadata.
//!
//! # Overview
//!
//! - [`pipeline`]: stage model, context threading, refinement loop, orchestrator
//! - [`llm`]: provider-agnostic inference with Anthropic and OpenAI backends
//! - [`search`]: multi-query web search for the research stage (Serper)
//! - [`prompts`]: stage personas and instructions
//! - [`progress`]: progress events, console and log reporters
//! - [`output`]: artifact persistence
//! - [`config`]: TOML + environment configuration
//!
//! # Quick Start
//!
//! ```rust
//! use postcrew::pipeline::{ExecutorSettings, PipelineOrchestrator, PipelineSettings, Stage, StageExecutor};
//! use postcrew::prompts::DefaultPrompts;
//! use postcrew::testing::{MemoryArtifactStore, RecordingProgress, ScriptedLlmProvider};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let llm = ScriptedLlmProvider::new()
//!     .with_reply(Stage::Writing, "Edge computing is moving compute to the data.")
//!     .with_reply(Stage::Critique, "Score: 9/10. Ready to publish.");
//!
//! let executor = StageExecutor::new(
//!     Arc::new(llm),
//!     Arc::new(DefaultPrompts::new()),
//!     ExecutorSettings::default(),
//! );
//! let orchestrator = PipelineOrchestrator::new(
//!     PipelineSettings::default(),
//!     executor,
//!     Arc::new(RecordingProgress::new()),
//!     Arc::new(MemoryArtifactStore::new()),
//! );
//!
//! let result = orchestrator.run("Edge computing").await.unwrap();
//! assert_eq!(result.metadata.iterations_used, 1);
//! # });
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod search;
pub mod testing;

pub use config::{ConfigError, GeneratorConfig, RuntimeCredentials};
pub use error::{sanitize_error_message, GeneratorError, GeneratorResult};
pub use output::{ArtifactLocation, ArtifactStore, FileArtifactStore, PersistenceError};
pub use pipeline::{
    PipelineError, PipelineOrchestrator, PipelineSettings, RunMetadata, RunResult, Stage,
    StageExecutor,
};
pub use progress::{ConsoleReporter, LogReporter, ProgressEvent, ProgressKind, ProgressSink};
