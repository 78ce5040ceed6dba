//! Configuration loading and validation tests
//!
//! Tests focus on observable behavior: what a config file produces, which
//! overrides win, and which settings are rejected.

use postcrew::config::{ConfigError, GeneratorConfig};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{contents}").unwrap();
    temp_file
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[llm]
provider = "openai"
model = "gpt-4o"
api_key_env = "OPENAI_API_KEY"
temperature = 0.4
max_tokens = 2048

[pipeline]
max_iterations = 5
stage_timeout_secs = 90

[search]
enabled = false
queries_count = 3
results_per_query = 4

[output]
dir = "posts"
show_thinking = false
"#,
    );

    let config = GeneratorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.llm.provider, "openai");
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.pipeline.max_iterations, 5);
    assert!(!config.search.enabled);
    assert_eq!(config.search.queries_count, 3);
    assert_eq!(config.output.dir, PathBuf::from("posts"));
    assert!(!config.output.show_thinking);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_config_fills_defaults() {
    let temp_file = write_config(
        r#"
[pipeline]
max_iterations = 1
"#,
    );

    let config = GeneratorConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.pipeline.max_iterations, 1);
    assert_eq!(config.pipeline.stage_timeout_secs, 300);
    assert_eq!(config.llm.provider, "anthropic");
    assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
    assert!(config.search.enabled);
    assert_eq!(config.search.api_key_env, "SERPER_API_KEY");
    assert_eq!(config.output.dir, PathBuf::from("outputs"));
}

#[test]
fn test_empty_file_is_the_default_config() {
    let temp_file = write_config("");
    let config = GeneratorConfig::load_from_file(temp_file.path()).unwrap();
    assert_eq!(config, GeneratorConfig::default());
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let temp_file = write_config("[llm\nprovider = ");
    let result = GeneratorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_wrong_value_type_is_a_parse_error() {
    let temp_file = write_config(
        r#"
[pipeline]
max_iterations = "three"
"#,
    );
    let result = GeneratorConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_explicit_missing_path_is_not_found() {
    let missing = Path::new("/definitely/not/here/postcrew.toml");

    assert!(matches!(
        GeneratorConfig::discover(Some(missing)),
        Err(ConfigError::NotFound(_))
    ));
    assert!(matches!(
        GeneratorConfig::load(Some(missing)),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_explicit_existing_path_is_discovered() {
    let temp_file = write_config("");
    let found = GeneratorConfig::discover(Some(temp_file.path())).unwrap();
    assert_eq!(found.as_deref(), Some(temp_file.path()));
}

#[test]
fn test_environment_overrides_file_values() {
    let temp_file = write_config(
        r#"
[llm]
model = "claude-sonnet-4-5-20250929"

[pipeline]
max_iterations = 2
"#,
    );
    let mut config = GeneratorConfig::load_from_file(temp_file.path()).unwrap();

    config
        .apply_overrides_from(env(&[
            ("MODEL_NAME", "claude-opus-4-1"),
            ("MAX_ITERATIONS", "4"),
            ("SEARCH_QUERIES_COUNT", "2"),
            ("OUTPUT_DIR", "/tmp/posts"),
            ("SHOW_THINKING", "False"),
        ]))
        .unwrap();

    assert_eq!(config.llm.model, "claude-opus-4-1");
    assert_eq!(config.pipeline.max_iterations, 4);
    assert_eq!(config.search.queries_count, 2);
    assert_eq!(config.output.dir, PathBuf::from("/tmp/posts"));
    assert!(!config.output.show_thinking);
}

#[test]
fn test_non_numeric_override_is_rejected() {
    let mut config = GeneratorConfig::default();
    let result = config.apply_overrides_from(env(&[("MAX_ITERATIONS", "lots")]));

    match result {
        Err(ConfigError::InvalidEnvVar { name, value }) => {
            assert_eq!(name, "MAX_ITERATIONS");
            assert_eq!(value, "lots");
        }
        other => panic!("Expected InvalidEnvVar, got {other:?}"),
    }
}

#[test]
fn test_validation_rejects_out_of_range_settings() {
    let cases: Vec<(&str, Box<dyn Fn(&mut GeneratorConfig)>)> = vec![
        ("provider", Box::new(|c| c.llm.provider = "cohere".to_string())),
        ("model", Box::new(|c| c.llm.model = "  ".to_string())),
        ("temperature", Box::new(|c| c.llm.temperature = 2.5)),
        ("max_tokens", Box::new(|c| c.llm.max_tokens = 0)),
        ("max_iterations", Box::new(|c| c.pipeline.max_iterations = 21)),
        ("stage_timeout", Box::new(|c| c.pipeline.stage_timeout_secs = 0)),
        ("queries_count low", Box::new(|c| c.search.queries_count = 0)),
        ("queries_count high", Box::new(|c| c.search.queries_count = 9)),
        ("results_per_query", Box::new(|c| c.search.results_per_query = 0)),
        (
            "base_url",
            Box::new(|c| c.llm.base_url = Some("not a url".to_string())),
        ),
    ];

    for (label, mutate) in cases {
        let mut config = GeneratorConfig::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(ConfigError::InvalidConfig(_))),
            "{label} should be rejected"
        );
    }
}

#[test]
fn test_zero_iterations_is_valid() {
    let mut config = GeneratorConfig::default();
    config.pipeline.max_iterations = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_config_runs_with_only_llm_key() {
    let config = GeneratorConfig::default();
    assert!(config.search.enabled);

    let credentials = config
        .resolve_credentials_from(env(&[("ANTHROPIC_API_KEY", "sk-ant-test")]))
        .unwrap();
    assert_eq!(credentials.llm_api_key, "sk-ant-test");
    assert!(credentials.search_api_key.is_none());
}

#[test]
fn test_blank_search_key_is_rejected() {
    let config = GeneratorConfig::default();
    let result = config.resolve_credentials_from(env(&[
        ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ("SERPER_API_KEY", "  "),
    ]));
    assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "SERPER_API_KEY"));
}

#[test]
fn test_search_key_ignored_when_search_disabled() {
    let mut config = GeneratorConfig::default();
    config.search.enabled = false;
    let credentials = config
        .resolve_credentials_from(env(&[("ANTHROPIC_API_KEY", "sk-ant-test")]))
        .unwrap();
    assert_eq!(credentials.llm_api_key, "sk-ant-test");
    assert!(credentials.search_api_key.is_none());
}

#[test]
fn test_blank_api_key_counts_as_missing() {
    let config = GeneratorConfig::default();
    let result = config.resolve_credentials_from(env(&[
        ("ANTHROPIC_API_KEY", "   "),
        ("SERPER_API_KEY", "serper"),
    ]));
    assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "ANTHROPIC_API_KEY"));
}

#[test]
fn test_settings_derive_from_sections() {
    let mut config = GeneratorConfig::default();
    config.pipeline.max_iterations = 2;
    config.pipeline.stage_timeout_secs = 45;
    config.search.queries_count = 3;

    let executor = config.executor_settings();
    assert_eq!(executor.model, config.llm.model);
    assert_eq!(executor.stage_timeout, Duration::from_secs(45));
    assert_eq!(executor.search_queries, 3);

    let pipeline = config.pipeline_settings();
    assert_eq!(pipeline.max_iterations, 2);
    assert_eq!(pipeline.model, config.llm.model);
}

#[test]
fn test_effective_config_round_trips_through_toml() {
    let mut config = GeneratorConfig::default();
    config.search.base_url = Some("http://localhost:8080".to_string());

    let rendered = config.to_toml().unwrap();
    let parsed: GeneratorConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, config);
}
