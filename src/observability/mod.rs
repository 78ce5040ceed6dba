//! Observability: structured logging and span macros

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{iteration_span, run_span, stage_span};
