//! Tests for CLI command parsing and validation.

use super::{Command, get_command, get_flags, load_config};
use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::settings::{CONFIG_FILE_NAME, INTEGRATION_TESTS_PATH, RestorationMode};
use std::fs;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn check_command_takes_a_path() {
    let command = get_command(&args(&["check", "scenario_a.rs"])).expect("command should parse");
    assert_eq!(
        command,
        Command::Check {
            path: String::from("scenario_a.rs"),
            config: None,
        }
    );
}

#[test]
fn check_command_accepts_flags_around_the_path() {
    let command = get_command(&args(&[
        "check",
        "--json",
        "scenario_b.rs",
        "--config",
        "strict.toml",
        "--lexical",
    ]))
    .expect("command should parse");

    assert_eq!(
        command,
        Command::Check {
            path: String::from("scenario_b.rs"),
            config: Some(String::from("strict.toml")),
        }
    );
}

#[test]
fn check_command_requires_a_path() {
    let error = get_command(&args(&["check", "--json"])).expect_err("missing path should fail");
    assert!(error.contains("Missing file path"));
}

#[test]
fn check_command_rejects_unknown_flags() {
    let error =
        get_command(&args(&["check", "a.rs", "--wat"])).expect_err("unknown flag should fail");
    assert!(error.contains("Unknown check flag"));
}

#[test]
fn check_command_rejects_a_second_path() {
    let error = get_command(&args(&["check", "a.rs", "b.rs"])).expect_err("two paths should fail");
    assert!(error.contains("exactly one file path"));
}

#[test]
fn check_command_rejects_missing_config_values() {
    let error =
        get_command(&args(&["check", "a.rs", "--config"])).expect_err("missing config value");
    assert!(error.contains("Missing value for --config"));

    let error = get_command(&args(&["check", "a.rs", "--config", "--json"]))
        .expect_err("flag instead of config value");
    assert!(error.contains("Missing value for --config"));
}

#[test]
fn tests_command_defaults_to_the_case_directory() {
    let command = get_command(&args(&["tests"])).expect("command should parse");
    assert_eq!(command, Command::CompilerTests(String::from(INTEGRATION_TESTS_PATH)));

    let command = get_command(&args(&["tests", "my_cases"])).expect("command should parse");
    assert_eq!(command, Command::CompilerTests(String::from("my_cases")));
}

#[test]
fn unknown_commands_are_rejected() {
    let error = get_command(&args(&["build"])).expect_err("unknown command");
    assert!(error.contains("Invalid command: 'build'"));
}

#[test]
fn flags_are_collected_from_anywhere() {
    let flags = get_flags(&args(&[
        "permcheck",
        "check",
        "--facts",
        "a.rs",
        "--hide-timers",
        "--lexical",
    ]));
    assert_eq!(flags, vec![Flag::ShowFacts, Flag::DisableTimers, Flag::Lexical]);
}

#[test]
fn explicit_config_files_must_exist() {
    let dir = tempfile::tempdir().expect("temp dir");
    let snippet = dir.path().join("a.rs");
    let missing = dir.path().join("missing.toml");

    let error = load_config(&snippet, missing.to_str()).expect_err("missing config should fail");
    assert_eq!(error.error_type, ErrorType::File);
}

#[test]
fn config_beside_the_snippet_is_discovered() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[checker]\nrestoration = \"lexical\"\n",
    )
    .expect("write config");

    let config = load_config(&dir.path().join("a.rs"), None).expect("config should load");
    assert_eq!(config.checker.restoration, RestorationMode::Lexical);
}
