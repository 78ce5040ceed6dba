//! Command line behavior of the `config` subcommand

use std::process::{Command, Output};
use tempfile::TempDir;

const OVERRIDE_VARS: [&str; 7] = [
    "ANTHROPIC_API_KEY",
    "SERPER_API_KEY",
    "MODEL_NAME",
    "MAX_ITERATIONS",
    "SEARCH_QUERIES_COUNT",
    "OUTPUT_DIR",
    "SHOW_THINKING",
];

fn run_config(workdir: &TempDir, env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_postcrew"));
    command.arg("config").current_dir(workdir.path());
    for name in OVERRIDE_VARS {
        command.env_remove(name);
    }
    for (name, value) in env {
        command.env(name, value);
    }
    command.output().unwrap()
}

#[test]
fn test_config_fails_without_llm_key() {
    let workdir = TempDir::new().unwrap();

    let output = run_config(&workdir, &[]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("ANTHROPIC_API_KEY"));
    assert!(!stdout.contains("Configuration is valid"));
}

#[test]
fn test_config_accepts_llm_key_alone() {
    let workdir = TempDir::new().unwrap();

    let output = run_config(&workdir, &[("ANTHROPIC_API_KEY", "sk-ant-test")]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("SERPER_API_KEY is not set"));
    assert!(stdout.contains("✅ Configuration is valid"));
}
