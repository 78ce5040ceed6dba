//! Generator configuration
//!
//! Loaded once per process from an optional TOML file, then overridden from
//! the environment and validated eagerly. Every section and field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! [llm]
//! provider = "anthropic"
//! model = "claude-sonnet-4-5-20250929"
//! api_key_env = "ANTHROPIC_API_KEY"
//!
//! [pipeline]
//! max_iterations = 3
//!
//! [search]
//! enabled = true
//! queries_count = 5
//! ```

use crate::pipeline::executor::ExecutorSettings;
use crate::pipeline::orchestrator::PipelineSettings;
use crate::search::QUERY_TEMPLATES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Config files probed, in order, when no path is given
pub const CONFIG_CANDIDATES: [&str; 2] = ["postcrew.toml", "config/postcrew.toml"];

/// Highest accepted `max_iterations`
pub const MAX_ITERATIONS_LIMIT: u32 = 20;

pub const SUPPORTED_PROVIDERS: [&str; 2] = ["anthropic", "openai"];

/// Full generator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub llm: LlmSection,
    pub pipeline: PipelineSection,
    pub search: SearchSection,
    pub output: OutputSection,
}

/// Model provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSection {
    /// "anthropic" or "openai"
    pub provider: String,
    pub model: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Sampling temperature (0.0 to 2.0)
    pub temperature: f32,
    pub max_tokens: u32,
    /// Override the provider's API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    /// Maximum edit cycles in the refinement loop
    pub max_iterations: u32,
    /// Bound on each stage call, in seconds
    pub stage_timeout_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            stage_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSection {
    pub enabled: bool,
    pub api_key_env: String,
    /// Number of query templates issued per research stage (1 to 8)
    pub queries_count: usize,
    pub results_per_query: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: "SERPER_API_KEY".to_string(),
            queries_count: 5,
            results_per_query: 5,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    /// Print every draft and critique while refining
    pub show_thinking: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            show_thinking: true,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// API keys resolved at startup
#[derive(Clone)]
pub struct RuntimeCredentials {
    pub llm_api_key: String,
    /// Present only when search is enabled
    pub search_api_key: Option<String>,
}

impl std::fmt::Debug for RuntimeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeCredentials")
            .field("llm_api_key", &"***")
            .field(
                "search_api_key",
                &self.search_api_key.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

impl GeneratorConfig {
    /// Parse a TOML file without applying overrides or validation
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Find the config file to use. An explicit path must exist; otherwise the
    /// first existing candidate wins, and `None` means built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            return Ok(Some(path.to_path_buf()));
        }

        Ok(CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file()))
    }

    /// Discover, parse, apply environment overrides and validate
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::discover(explicit)? {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                Self::load_from_file(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `MODEL_NAME`, `MAX_ITERATIONS`, `SEARCH_QUERIES_COUNT`,
    /// `OUTPUT_DIR` and `SHOW_THINKING` from `lookup`
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(value) = lookup("MAX_ITERATIONS") {
            self.pipeline.max_iterations = parse_env("MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = lookup("SEARCH_QUERIES_COUNT") {
            self.search.queries_count = parse_env("SEARCH_QUERIES_COUNT", &value)?;
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("SHOW_THINKING") {
            self.output.show_thinking = value.trim().eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider '{}' (expected one of: {})",
                self.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidConfig(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidConfig(
                "llm.max_tokens must be positive".to_string(),
            ));
        }
        if self.pipeline.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::InvalidConfig(format!(
                "pipeline.max_iterations must be at most {MAX_ITERATIONS_LIMIT}, got {}",
                self.pipeline.max_iterations
            )));
        }
        if self.pipeline.stage_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "pipeline.stage_timeout_secs must be positive".to_string(),
            ));
        }
        if !(1..=QUERY_TEMPLATES.len()).contains(&self.search.queries_count) {
            return Err(ConfigError::InvalidConfig(format!(
                "search.queries_count must be between 1 and {}, got {}",
                QUERY_TEMPLATES.len(),
                self.search.queries_count
            )));
        }
        if self.search.results_per_query == 0 {
            return Err(ConfigError::InvalidConfig(
                "search.results_per_query must be positive".to_string(),
            ));
        }
        for (field, base_url) in [
            ("llm.base_url", &self.llm.base_url),
            ("search.base_url", &self.search.base_url),
        ] {
            if let Some(base_url) = base_url {
                url::Url::parse(base_url).map_err(|e| {
                    ConfigError::InvalidConfig(format!("{field} is not a valid URL: {e}"))
                })?;
            }
        }
        Ok(())
    }

    pub fn resolve_credentials(&self) -> Result<RuntimeCredentials, ConfigError> {
        self.resolve_credentials_from(|name| std::env::var(name).ok())
    }

    /// Read the API keys through `lookup`.
    ///
    /// The LLM key is required and a blank value counts as missing. An unset
    /// search key turns live search off; a search key that is set but blank
    /// is an error.
    pub fn resolve_credentials_from<F>(&self, lookup: F) -> Result<RuntimeCredentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm_api_key = lookup(&self.llm.api_key_env)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))?;

        let search_api_key = if self.search.enabled {
            match lookup(&self.search.api_key_env) {
                Some(value) if value.trim().is_empty() => {
                    return Err(ConfigError::EnvVarNotFound(
                        self.search.api_key_env.clone(),
                    ));
                }
                Some(value) => Some(value),
                None => {
                    warn!(
                        env_var = %self.search.api_key_env,
                        "Search API key not set; research will use model knowledge only"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(RuntimeCredentials {
            llm_api_key,
            search_api_key,
        })
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            stage_timeout: Duration::from_secs(self.pipeline.stage_timeout_secs),
            search_queries: self.search.queries_count,
            results_per_query: self.search.results_per_query,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_iterations: self.pipeline.max_iterations,
            model: self.llm.model.clone(),
        }
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.model, "claude-sonnet-4-5-20250929");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.pipeline.max_iterations, 3);
        assert_eq!(config.search.queries_count, 5);
        assert_eq!(config.output.dir, PathBuf::from("outputs"));
        assert!(config.output.show_thinking);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GeneratorConfig = toml::from_str(
            r#"
[pipeline]
max_iterations = 5
"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.max_iterations, 5);
        assert_eq!(config.pipeline.stage_timeout_secs, 300);
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GeneratorConfig::default();
        config
            .apply_overrides_from(lookup(&[
                ("MODEL_NAME", "claude-opus"),
                ("MAX_ITERATIONS", "2"),
                ("SEARCH_QUERIES_COUNT", "8"),
                ("OUTPUT_DIR", "/tmp/posts"),
                ("SHOW_THINKING", "False"),
            ]))
            .unwrap();

        assert_eq!(config.llm.model, "claude-opus");
        assert_eq!(config.pipeline.max_iterations, 2);
        assert_eq!(config.search.queries_count, 8);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/posts"));
        assert!(!config.output.show_thinking);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = GeneratorConfig::default();
        let err = config
            .apply_overrides_from(lookup(&[("MAX_ITERATIONS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = GeneratorConfig::default();
        config.search.queries_count = 9;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.llm.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.llm.provider = "cohere".to_string();
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.pipeline.max_iterations = 21;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.llm.base_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_is_valid() {
        let mut config = GeneratorConfig::default();
        config.pipeline.max_iterations = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_require_llm_key() {
        let err = GeneratorConfig::default()
            .resolve_credentials_from(lookup(&[("SERPER_API_KEY", "s")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_credentials_skip_search_key_when_disabled() {
        let mut config = GeneratorConfig::default();
        config.search.enabled = false;
        let creds = config
            .resolve_credentials_from(lookup(&[("ANTHROPIC_API_KEY", "sk-ant-123")]))
            .unwrap();
        assert_eq!(creds.llm_api_key, "sk-ant-123");
        assert!(creds.search_api_key.is_none());
    }

    #[test]
    fn test_credentials_without_search_key_fall_back_to_no_search() {
        let creds = GeneratorConfig::default()
            .resolve_credentials_from(lookup(&[("ANTHROPIC_API_KEY", "sk-ant-123")]))
            .unwrap();
        assert_eq!(creds.llm_api_key, "sk-ant-123");
        assert!(creds.search_api_key.is_none());
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = RuntimeCredentials {
            llm_api_key: "sk-ant-secret".to_string(),
            search_api_key: Some("serper-secret".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_settings_projection() {
        let config = GeneratorConfig::default();
        let executor = config.executor_settings();
        assert_eq!(executor.stage_timeout, Duration::from_secs(300));
        assert_eq!(executor.results_per_query, 5);
        assert_eq!(config.pipeline_settings().max_iterations, 3);
    }
}
