//! Top-level error type for the generator
//!
//! Each layer has its own `thiserror` enum; [`GeneratorError`] gathers them
//! for the binary. Anything shown to a user goes through
//! [`sanitize_error_message`] first.

use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::output::PersistenceError;
use crate::pipeline::orchestrator::PipelineError;
use crate::pipeline::stage::Stage;
use crate::search::SearchError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_MESSAGE_LEN: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search provider error: {0}")]
    Search(#[from] SearchError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    /// Whether the user interrupted the run
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GeneratorError::Pipeline(PipelineError::Cancelled { .. }))
    }

    /// Stage that was running when the error occurred, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GeneratorError::Pipeline(e) => e.stage(),
            _ => None,
        }
    }

    /// Sanitized, user-facing description
    pub fn user_message(&self) -> String {
        let message = match self {
            GeneratorError::Pipeline(PipelineError::Stage { source, iteration }) => {
                let agent = source.stage.agent_name();
                if *iteration > 0 {
                    format!("{agent} failed in iteration {iteration}: {}", source.cause)
                } else {
                    format!("{agent} failed: {}", source.cause)
                }
            }
            _ => self.to_string(),
        };
        sanitize_error_message(&message)
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static API_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsk-[A-Za-z0-9_-]{8,}").expect("API key pattern is valid"));

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("sensitive path pattern is valid")
});

/// Redact secrets and sensitive paths, and cap the length at 500 bytes
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let sanitized = API_KEY_PATTERN.replace_all(&sanitized, "sk-***");
    let mut sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .into_owned();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN - TRUNCATE_SUFFIX.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(TRUNCATE_SUFFIX);
    }

    sanitized
}

pub type GeneratorResult<T> = Result<T, GeneratorError>;
