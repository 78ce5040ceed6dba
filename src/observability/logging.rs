//! Structured logging using the tracing crate
//!
//! All log output goes to stderr so the console reporter owns stdout.
//!
//! ## Log Format Options
//!
//! - `json` - Structured JSON for log aggregation
//! - `pretty` - Human-readable, multi-line, coloured
//! - `compact` - Terminal-friendly single lines (default for the CLI)
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: ERROR, WARN, INFO, DEBUG, TRACE - defaults to WARN, raised by `-v`
//! - `LOG_FORMAT`: json, pretty, compact - defaults to compact
//! - `LOG_SPANS`: Include span open/close events (true/false) - defaults to false
//! - `RUST_LOG`: Overrides filtering entirely (env_logger syntax)
//!
//! ```bash
//! LOG_FORMAT=json LOG_LEVEL=DEBUG postcrew generate -t "Edge computing" 2> run.log
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Dependencies whose own logging is capped at WARN
const NOISY_TARGETS: [&str; 4] = ["hyper", "hyper_util", "reqwest", "rustls"];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Parse log format from string; unknown values fall back to JSON
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

/// Parse a level name, defaulting to `fallback`
pub fn parse_level(s: &str, fallback: Level) -> Level {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "INFO" => Level::INFO,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => fallback,
    }
}

/// Level for a `-v` count: 0 warn, 1 info, 2 debug, 3+ trace
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filter for `level` with dependency noise capped
pub fn build_filter(level: Level) -> EnvFilter {
    NOISY_TARGETS
        .iter()
        .filter_map(|target| format!("{target}=warn").parse().ok())
        .fold(EnvFilter::new(level.to_string()), |filter, directive| {
            filter.add_directive(directive)
        })
}

/// Initialize logging with explicit settings. Later calls are ignored.
pub fn init_logging(level: Level, format: LogFormat, include_spans: bool) {
    let filter = match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => build_filter(level),
    };

    let span_events = if include_spans {
        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events),
            )
            .try_init(),
        LogFormat::Pretty => subscriber
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(true)
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events),
            )
            .try_init(),
        LogFormat::Compact => subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_span_events(span_events),
            )
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
}

/// Initialize logging from the environment, with `verbose` as the default level
pub fn init_default_logging(verbose: u8) {
    let level = env::var("LOG_LEVEL")
        .map(|value| parse_level(&value, level_for_verbosity(verbose)))
        .unwrap_or_else(|_| level_for_verbosity(verbose));

    let format = env::var("LOG_FORMAT")
        .map(|value| LogFormat::parse(&value))
        .unwrap_or(LogFormat::Compact);

    let include_spans = env::var("LOG_SPANS")
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    init_logging(level, format, include_spans);
}

/// Span covering a whole generation run
#[macro_export]
macro_rules! run_span {
    ($($field:tt)*) => {
        tracing::info_span!("generation_run", $($field)*)
    };
}

/// Span covering one stage execution
#[macro_export]
macro_rules! stage_span {
    ($($field:tt)*) => {
        tracing::info_span!("stage_execution", $($field)*)
    };
}

/// Span covering one critique/edit cycle
#[macro_export]
macro_rules! iteration_span {
    ($($field:tt)*) => {
        tracing::info_span!("refinement_iteration", $($field)*)
    };
}

pub use {iteration_span, run_span, stage_span};
