//! Command-line entrypoints for permcheck.
//!
//! This module parses CLI commands and dispatches them into single file checks
//! and the snippet case runner.

use crate::build_system::check::check_file;
use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::display_messages::{
    print_borrow_report, print_compiler_messages, print_json,
};
use crate::compiler_tests::integration_test_runner::run_all_test_cases;
use crate::settings::{Config, INTEGRATION_TESTS_PATH, OutputFormat};
use saying::say;
use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    // Checks one snippet file
    Check {
        path: String,
        config: Option<String>,
    },

    Help,
    CompilerTests(String), // Runs the success/failure snippet cases in a directory
}

pub fn start_cli() -> ExitCode {
    let compiler_args: Vec<String> = env::args().collect();

    if compiler_args.len() < 2 {
        print_help(false);
        return ExitCode::SUCCESS;
    }

    let command = match get_command(&compiler_args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return ExitCode::FAILURE;
        }
    };

    // Gather a list of any additional flags
    let flags = get_flags(&compiler_args);

    match command {
        Command::Help => {
            print_help(false);
            ExitCode::SUCCESS
        }

        Command::Check { path, config } => run_check(&path, config.as_deref(), &flags),

        Command::CompilerTests(dir) => {
            let show_warnings = !flags.contains(&Flag::DisableWarnings);
            let summary = run_all_test_cases(Path::new(&dir), show_warnings);
            if summary.all_correct() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run_check(path: &str, config_path: Option<&str>, flags: &[Flag]) -> ExitCode {
    let start = Instant::now();
    let snippet_path = Path::new(path);

    let mut config = match load_config(snippet_path, config_path) {
        Ok(config) => config,
        Err(error) => {
            let messages = CompilerMessages::from_error(error);
            if flags.contains(&Flag::Json) {
                print_json(&messages);
            } else {
                print_compiler_messages(messages);
            }
            return ExitCode::FAILURE;
        }
    };
    config.apply_flags(flags);

    let outcome = check_file(snippet_path, &config);
    let failed = outcome.has_errors();

    match config.output.format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Pretty => {
            if config.output.show_facts {
                print_borrow_report(&outcome.report);
            }

            print_compiler_messages(outcome.messages);

            if !failed {
                say!(Green "\n✓ No ownership errors in ", Bold path);
            }
            if config.output.show_timers {
                say!("\nChecked in: ", Green Bold #start.elapsed());
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// An explicit `--config` file must exist, a discovered one may be missing
fn load_config(snippet_path: &Path, config_path: Option<&str>) -> Result<Config, CompilerError> {
    match config_path {
        Some(config_path) => {
            let config_path = Path::new(config_path);
            if !config_path.exists() {
                return Err(CompilerError::file_error(config_path, "Config file does not exist"));
            }
            Config::load(config_path)
        }
        None => Config::discover(snippet_path),
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") => Ok(Command::Help),

        Some("check") => parse_check_command(args),

        Some("tests") => match args.get(1) {
            Some(dir) if !dir.starts_with("--") => Ok(Command::CompilerTests(dir.to_owned())),
            _ => Ok(Command::CompilerTests(String::from(INTEGRATION_TESTS_PATH))),
        },

        _ => Err(format!("Invalid command: '{}'", command.unwrap_or_default())),
    }
}

fn get_flags(args: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--hide-warnings" => flags.push(Flag::DisableWarnings),
            "--hide-timers" => flags.push(Flag::DisableTimers),
            "--facts" => flags.push(Flag::ShowFacts),
            "--json" => flags.push(Flag::Json),
            "--lexical" => flags.push(Flag::Lexical),
            _ => {}
        }
    }

    flags
}

fn parse_check_command(args: &[String]) -> Result<Command, String> {
    let mut path = String::new();
    let mut config = None;
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" => {
                let Some(config_path) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --config"));
                };
                if config_path.starts_with("--") {
                    return Err(String::from("Missing value for --config"));
                }
                config = Some(config_path.to_owned());
                index += 2;
            }
            "--json" | "--lexical" | "--facts" | "--hide-warnings" | "--hide-timers" => {
                index += 1;
            }
            _ if arg.starts_with("--") => {
                return Err(format!(
                    "Unknown check flag: '{arg}'. Supported flags are --json, --lexical, --facts, --hide-warnings, --hide-timers and --config."
                ));
            }
            _ => {
                if path.is_empty() {
                    path = arg.to_owned();
                    index += 1;
                } else {
                    return Err(String::from("Check command accepts exactly one file path."));
                }
            }
        }
    }

    if path.is_empty() {
        return Err(String::from("Missing file path: permcheck check <file.rs>"));
    }

    Ok(Command::Check { path, config })
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "permcheck - ownership, borrow and lifetime checks for Rust snippets");
        say!("Usage: ", Bold "<command>", Italic " <args>");
    }
    say!(Green Bold "\nCommands:");
    say!("  check <file.rs>   - Checks a snippet");
    say!("  tests [dir]       - Runs the success/failure snippet cases (default: tests/cases)");
    say!("  help              - Shows this message");

    say!(Green Bold "\nFlags:");
    say!("  --json            - Prints diagnostics and the borrow report as JSON");
    say!("  --lexical         - Loans last until their holders go out of scope");
    say!("  --facts           - Prints the permissions of every binding after each statement");
    say!("  --hide-warnings");
    say!("  --hide-timers");
    say!("  --config <path>   - Uses this permcheck.toml instead of the one beside the snippet");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
