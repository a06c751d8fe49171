use permcheck::{
    CaseResult, Config, ErrorType, OutputFormat, RestorationMode, check_file, collect_cases,
    run_case,
};
use std::fs;
use std::path::Path;

fn cases_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/cases"))
}

#[test]
fn test_all_cases_in_folder() {
    let cases = collect_cases(cases_dir());
    assert!(!cases.is_empty(), "no snippet cases found");

    let mut errors = Vec::new();
    for (path, should_fail) in cases {
        let (result, outcome) = run_case(&path, should_fail, &Config::default());
        if !result.is_correct() {
            let messages = outcome
                .messages
                .errors
                .iter()
                .map(|error| error.msg.clone())
                .collect::<Vec<_>>();
            errors.push(format!("{}: {result:?} {messages:?}", path.display()));
        }
    }

    if !errors.is_empty() {
        panic!("Some cases failed:\n{}", errors.join("\n"));
    }
}

#[test]
fn every_failure_case_names_its_error() {
    for (path, should_fail) in collect_cases(cases_dir()) {
        if !should_fail {
            continue;
        }

        let source = fs::read_to_string(&path).expect("case should be readable");
        assert!(
            permcheck::expected_error(&source).is_some(),
            "{} has no expect line",
            path.display()
        );
    }
}

#[test]
fn config_beside_the_snippet_switches_to_lexical_restoration() {
    let dir = tempfile::tempdir().expect("temp dir");
    let snippet = dir.path().join("push.rs");
    fs::write(
        &snippet,
        "// expect: ConflictingBorrow
fn main() {
    let mut v = vec![1, 2, 3];
    let r1 = &v[2];
    println!(\"{}\", r1);
    v.push(4);
}
",
    )
    .expect("write snippet");

    let (result, _) = run_case(&snippet, false, &Config::default());
    assert_eq!(result, CaseResult::Passed);

    fs::write(
        dir.path().join("permcheck.toml"),
        "[checker]\nrestoration = \"lexical\"\nparallel = false\n\n[output]\nformat = \"json\"\n",
    )
    .expect("write config");

    let config = Config::discover(&snippet).expect("config should load");
    assert_eq!(config.checker.restoration, RestorationMode::Lexical);
    assert_eq!(config.output.format, OutputFormat::Json);

    let (result, _) = run_case(&snippet, true, &config);
    assert_eq!(result, CaseResult::ExpectedFailure);
}

#[test]
fn the_outcome_serializes_to_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let snippet = dir.path().join("moved.rs");
    fs::write(
        &snippet,
        "fn main() {\n    let x = String::from(\"hello\");\n    let y = x;\n    println!(\"{} {}\", x, y);\n}\n",
    )
    .expect("write snippet");

    let mut config = Config::default();
    config.output.show_facts = true;
    let outcome = check_file(&snippet, &config);
    assert_eq!(outcome.messages.errors[0].error_type, ErrorType::UseOfMovedValue);

    let json = serde_json::to_value(&outcome).expect("outcome should serialize");
    assert!(json["messages"]["errors"].is_array());
    assert!(json["report"]["functions"].is_array());
}
