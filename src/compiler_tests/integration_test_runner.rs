//! Test runner for snippet cases.
//!
//! `success/` holds snippets the checker must accept. `failure/` holds snippets it must
//! reject, each with a `// expect: Kind` line naming the first error it should report.
use crate::build_system::check::{CheckOutcome, check_file};
use crate::compiler_frontend::compiler_errors::{ErrorType, error_type_from_str, error_type_to_str};
use crate::compiler_frontend::compiler_warnings::print_formatted_warning;
use crate::compiler_frontend::display_messages::print_formatted_error;
use crate::settings::{Config, EXPECTED_ERROR_MARKER, SNIPPET_FILE_EXTENSION};
use saying::say;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR_LINE_LENGTH: usize = 37;

/// What happened to one case file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseResult {
    Passed,
    ExpectedFailure,
    Failed(Vec<ErrorType>),
    UnexpectedSuccess,

    // Rejected, but not with the error the case expects
    WrongError {
        expected: ErrorType,
        found: ErrorType,
    },

    // The failure case has no usable expect line
    MissingExpectation,
}

impl CaseResult {
    pub fn is_correct(&self) -> bool {
        matches!(self, CaseResult::Passed | CaseResult::ExpectedFailure)
    }
}

#[derive(Debug, Default)]
pub struct TestSummary {
    pub cases: Vec<(PathBuf, CaseResult)>,
}

impl TestSummary {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn correct(&self) -> usize {
        self.cases.iter().filter(|(_, result)| result.is_correct()).count()
    }

    pub fn all_correct(&self) -> bool {
        self.correct() == self.total()
    }

    fn count(&self, wanted: fn(&CaseResult) -> bool) -> usize {
        self.cases.iter().filter(|(_, result)| wanted(result)).count()
    }
}

/// Reads the error kind a failure case names, like `// expect: ConflictingBorrow`
pub fn expected_error(source: &str) -> Option<ErrorType> {
    source
        .lines()
        .find_map(|line| line.trim().strip_prefix(EXPECTED_ERROR_MARKER))
        .and_then(error_type_from_str)
}

/// Checks one case file and compares the outcome with what its folder promises
pub fn run_case(path: &Path, should_fail: bool, config: &Config) -> (CaseResult, CheckOutcome) {
    let outcome = check_file(path, config);
    let found = outcome.messages.errors.first().map(|error| error.error_type);

    let result = match (should_fail, found) {
        (false, None) => CaseResult::Passed,
        (false, Some(_)) => CaseResult::Failed(
            outcome
                .messages
                .errors
                .iter()
                .map(|error| error.error_type)
                .collect(),
        ),
        (true, None) => CaseResult::UnexpectedSuccess,
        (true, Some(found)) => {
            let expected = fs::read_to_string(path)
                .ok()
                .and_then(|source| expected_error(&source));

            match expected {
                Some(expected) if expected == found => CaseResult::ExpectedFailure,
                Some(expected) => CaseResult::WrongError { expected, found },
                None => CaseResult::MissingExpectation,
            }
        }
    };

    (result, outcome)
}

/// Every case in `cases_dir/success` and `cases_dir/failure`, in file name order
pub fn collect_cases(cases_dir: &Path) -> Vec<(PathBuf, bool)> {
    let mut cases = Vec::new();

    for (folder, should_fail) in [("success", false), ("failure", true)] {
        let Ok(entries) = fs::read_dir(cases_dir.join(folder)) else {
            continue;
        };

        let mut paths = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == SNIPPET_FILE_EXTENSION))
            .collect::<Vec<_>>();
        paths.sort();

        cases.extend(paths.into_iter().map(|path| (path, should_fail)));
    }

    cases
}

/// Run all test cases from the given directory and print a summary
pub fn run_all_test_cases(cases_dir: &Path, show_warnings: bool) -> TestSummary {
    say!("Running all permcheck test cases...\n");
    let timer = std::time::Instant::now();

    // Cases run one at a time, each on its own config beside it when there is one
    let mut summary = TestSummary::default();
    let mut last_folder = None;

    for (path, should_fail) in collect_cases(cases_dir) {
        if last_folder != Some(should_fail) {
            if should_fail {
                say!(Cyan "\nTesting files that should fail:");
            } else {
                say!(Cyan "Testing files that should succeed:");
            }
            println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
            last_folder = Some(should_fail);
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("  {file_name}");

        let config = match Config::discover(&path) {
            Ok(config) => config,
            Err(error) => {
                say!(Red "✗ BAD CONFIG");
                print_formatted_error(error);
                summary.cases.push((path, CaseResult::Failed(vec![ErrorType::Config])));
                continue;
            }
        };

        let (result, outcome) = run_case(&path, should_fail, &config);
        match &result {
            CaseResult::Passed => {
                say!(Green "✓ PASS");
            }
            CaseResult::ExpectedFailure => {
                say!(Green "✓ EXPECTED FAILURE");
                for error in &outcome.messages.errors {
                    say!(Yellow error_type_to_str(&error.error_type));
                }
            }
            CaseResult::Failed(_) => {
                say!(Red "✗ FAIL");
                for error in outcome.messages.errors.iter().cloned() {
                    print_formatted_error(error);
                }
            }
            CaseResult::UnexpectedSuccess => {
                say!(Yellow "✗ UNEXPECTED SUCCESS");
            }
            CaseResult::WrongError { expected, found } => {
                say!(
                    Red "✗ WRONG ERROR: expected ",
                    Yellow error_type_to_str(expected),
                    Red " but found ",
                    Yellow error_type_to_str(found)
                );
            }
            CaseResult::MissingExpectation => {
                say!(Yellow "✗ NO EXPECTATION: add a '", EXPECTED_ERROR_MARKER, " Kind' line");
            }
        }

        if !outcome.messages.warnings.is_empty() {
            say!(Yellow "With ", outcome.messages.warnings.len().to_string(), " warnings");
            if show_warnings {
                for warning in outcome.messages.warnings {
                    print_formatted_warning(warning);
                }
            }
        }

        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
        summary.cases.push((path, result));
    }

    print_summary(&summary, timer.elapsed());
    summary
}

fn print_summary(summary: &TestSummary, elapsed: std::time::Duration) {
    let total_tests = summary.total();
    let passed_tests = summary.count(|result| *result == CaseResult::Passed);
    let failed_tests = summary.count(|result| matches!(result, CaseResult::Failed(_)));
    let expected_failures = summary.count(|result| *result == CaseResult::ExpectedFailure);
    let unexpected_successes = summary.count(|result| *result == CaseResult::UnexpectedSuccess);
    let wrong_errors = summary.count(|result| {
        matches!(result, CaseResult::WrongError { .. } | CaseResult::MissingExpectation)
    });

    println!("\n{}", "=".repeat(SEPARATOR_LINE_LENGTH));
    print!("Test Results Summary. Took: ");
    say!(Green #elapsed);
    say!("  Total tests: ", Yellow total_tests);
    say!("  Accepted snippets: ", Blue passed_tests);
    say!("  Rejected snippets: ", Blue failed_tests);
    say!("  Expected failures: ", Blue expected_failures);
    say!("  Unexpected successes: ", Blue unexpected_successes);
    say!("  Wrong errors: ", Blue wrong_errors);

    let correct_results = summary.correct();
    let incorrect_results = total_tests - correct_results;

    println!("\n  Correct results: {correct_results} / {total_tests}");
    println!("  Incorrect results: {incorrect_results} / {total_tests}");

    if total_tests == 0 {
        say!(Yellow "\nNo test cases found");
    } else if incorrect_results == 0 {
        say!("\n🎉 All tests behaved as expected!");
    } else {
        let percentage = (correct_results as f64 / total_tests as f64) * 100.0;
        say!(Yellow "\n⚠ ", Bright Yellow format!("{:.1}", percentage), " %", Reset " of tests behaved as expected");
    }

    println!("{}", "=".repeat(SEPARATOR_LINE_LENGTH));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_expected_error_kind() {
        let source = "// Scenario A\n// expect: UseOfMovedValue\nfn main() {}\n";
        assert_eq!(expected_error(source), Some(ErrorType::UseOfMovedValue));
        assert_eq!(expected_error("fn main() {}"), None);
        assert_eq!(expected_error("// expect: NotAKind"), None);
    }

    #[test]
    fn wrong_error_kinds_are_incorrect() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("moved.rs");
        fs::write(
            &path,
            "// expect: ConflictingBorrow\nfn main() {\n    let s = String::new();\n    let t = s;\n    println!(\"{}\", s);\n}\n",
        )
        .expect("write case");

        let (result, _) = run_case(&path, true, &Config::default());
        assert_eq!(
            result,
            CaseResult::WrongError {
                expected: ErrorType::ConflictingBorrow,
                found: ErrorType::UseOfMovedValue,
            }
        );
        assert!(!result.is_correct());
    }

    #[test]
    fn collects_cases_from_both_folders() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("success")).expect("success dir");
        fs::create_dir_all(dir.path().join("failure")).expect("failure dir");
        fs::write(dir.path().join("success/b.rs"), "fn main() {}").expect("write");
        fs::write(dir.path().join("success/a.rs"), "fn main() {}").expect("write");
        fs::write(dir.path().join("success/notes.md"), "skipped").expect("write");
        fs::write(dir.path().join("failure/c.rs"), "// expect: Syntax\nfn main( {}").expect("write");

        let cases = collect_cases(dir.path());
        let names = cases
            .iter()
            .map(|(path, should_fail)| {
                let name = path.file_name().map(|name| name.to_string_lossy().to_string());
                (name.unwrap_or_default(), *should_fail)
            })
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                (String::from("a.rs"), false),
                (String::from("b.rs"), false),
                (String::from("c.rs"), true),
            ]
        );

        let summary = TestSummary {
            cases: cases
                .iter()
                .map(|(path, should_fail)| {
                    let (result, _) = run_case(path, *should_fail, &Config::default());
                    (path.clone(), result)
                })
                .collect(),
        };
        assert!(summary.all_correct());
    }
}
