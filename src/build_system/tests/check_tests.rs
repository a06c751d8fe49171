use super::*;
use crate::compiler_frontend::Flag;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::compiler_warnings::WarningKind;
use std::path::PathBuf;

fn sequential_config() -> Config {
    let mut config = Config::default();
    config.checker.parallel = false;
    config
}

fn check(source: &str) -> CheckOutcome {
    check_source(source, Path::new("snippet.rs"), &sequential_config())
}

fn error_kinds(outcome: &CheckOutcome) -> Vec<ErrorType> {
    outcome
        .messages
        .errors
        .iter()
        .map(|error| error.error_type)
        .collect()
}

#[test]
fn borrow_errors_carry_the_snippet_path() {
    let outcome = check(
        "fn main() {
             let x = String::from(\"hello\");
             let y = x;
             println!(\"{}\", x);
         }",
    );

    assert_eq!(error_kinds(&outcome), vec![ErrorType::UseOfMovedValue]);
    assert_eq!(outcome.messages.errors[0].file_path, PathBuf::from("snippet.rs"));
    assert_eq!(outcome.report.stats.functions_analyzed, 1);
}

#[test]
fn syntax_errors_stop_before_borrow_checking() {
    let outcome = check("fn main() { let x = ; }");

    assert_eq!(error_kinds(&outcome), vec![ErrorType::Syntax]);
    assert_eq!(outcome.messages.errors[0].file_path, PathBuf::from("snippet.rs"));
    assert!(outcome.report.functions.is_empty());
}

#[test]
fn unknown_names_are_reported_by_lowering() {
    let outcome = check("fn main() { println!(\"{}\", missing); }");

    assert!(outcome.has_errors());
    assert!(outcome.report.functions.is_empty());
}

#[test]
fn warnings_survive_a_clean_check() {
    let outcome = check(
        "fn main() {
             let mut unused = 5;
         }",
    );

    assert!(!outcome.has_errors());
    let kinds = outcome
        .messages
        .warnings
        .iter()
        .map(|warning| warning.warning_kind)
        .collect::<Vec<_>>();
    assert!(kinds.contains(&WarningKind::UnusedVariable));
}

#[test]
fn warnings_can_be_hidden() {
    let mut config = sequential_config();
    config.apply_flags(&[Flag::DisableWarnings]);

    let outcome = check_source("fn main() { let unused = 5; }", Path::new("snippet.rs"), &config);
    assert!(outcome.messages.warnings.is_empty());
}

#[test]
fn lexical_restoration_comes_from_the_config() {
    let source = "fn main() {
                      let mut v = vec![1, 2, 3];
                      let num = &v[2];
                      println!(\"{}\", *num);
                      v.push(4);
                  }";

    assert!(!check(source).has_errors());

    let mut config = sequential_config();
    config.apply_flags(&[Flag::Lexical]);
    let outcome = check_source(source, Path::new("snippet.rs"), &config);
    assert_eq!(error_kinds(&outcome), vec![ErrorType::ConflictingBorrow]);
}

#[test]
fn extra_copy_types_come_from_the_config() {
    let source = "struct Point { x: i32, y: i32 }
                  fn main() {
                      let a = Point { x: 1, y: 2 };
                      let b = a;
                      println!(\"{} {}\", a.x, b.y);
                  }";

    assert_eq!(error_kinds(&check(source)), vec![ErrorType::UseOfMovedValue]);

    let mut config = sequential_config();
    config.types.copy.push(String::from("Point"));
    let outcome = check_source(source, Path::new("snippet.rs"), &config);
    assert!(!outcome.has_errors());
}

#[test]
fn facts_are_collected_when_asked_for() {
    let mut config = sequential_config();
    config.apply_flags(&[Flag::ShowFacts]);

    let outcome = check_source(
        "fn main() { let s = String::new(); println!(\"{}\", s); }",
        Path::new("snippet.rs"),
        &config,
    );
    let main = outcome.report.function("main").expect("main should be reported");
    assert!(!main.facts.is_empty());
}

#[test]
fn check_file_reads_the_snippet() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("scenario_a.rs");
    fs::write(
        &path,
        "fn main() {\n    let x = String::from(\"hello\");\n    let y = x;\n    println!(\"{}\", x);\n}\n",
    )
    .expect("write snippet");

    let outcome = check_file(&path, &sequential_config());
    assert_eq!(error_kinds(&outcome), vec![ErrorType::UseOfMovedValue]);
    assert_eq!(outcome.messages.errors[0].file_path, path);
}

#[test]
fn check_file_rejects_other_extensions() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("notes.txt");
    fs::write(&path, "fn main() {}").expect("write file");

    let outcome = check_file(&path, &sequential_config());
    assert_eq!(error_kinds(&outcome), vec![ErrorType::File]);
}

#[test]
fn missing_files_are_file_errors() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outcome = check_file(&dir.path().join("missing.rs"), &sequential_config());
    assert_eq!(error_kinds(&outcome), vec![ErrorType::File]);
}
