//! Runs one snippet through the whole checker.
//!
//! Every stage can stop the check, but only the borrow checker can report more
//! than one error: each function is checked on its own and adds at most one.

use crate::compiler_frontend::CompilerFrontend;
use crate::compiler_frontend::analysis::borrow_checker::{BorrowCheckReport, BorrowOutcome};
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::string_interning::StringTable;
use crate::settings::{Config, SNIPPET_FILE_EXTENSION};
use crate::timer_log;
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Diagnostics plus the borrow report for a checked snippet.
/// The report is empty when an earlier stage already failed.
#[derive(Debug, Default, Serialize)]
pub struct CheckOutcome {
    pub messages: CompilerMessages,
    pub report: BorrowCheckReport,
}

impl CheckOutcome {
    fn from_messages(messages: CompilerMessages) -> Self {
        Self {
            messages,
            report: BorrowCheckReport::default(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.messages.has_errors()
    }
}

/// Reads and checks a snippet file.
pub fn check_file(source_path: &Path, config: &Config) -> CheckOutcome {
    if source_path.extension().and_then(OsStr::to_str) != Some(SNIPPET_FILE_EXTENSION) {
        let error = CompilerError::file_error(
            source_path,
            format!("Snippets are Rust source files, expected a .{SNIPPET_FILE_EXTENSION} file"),
        );
        return CheckOutcome::from_messages(CompilerMessages::from_error(error));
    }

    let source_code = match fs::read_to_string(source_path) {
        Ok(source_code) => source_code,
        Err(e) => {
            let error = CompilerError::file_error(source_path, format!("Could not read the snippet: {e}"));
            return CheckOutcome::from_messages(CompilerMessages::from_error(error));
        }
    };

    check_source(&source_code, source_path, config)
}

/// Checks snippet source that is already in memory.
/// `source_path` is only used to label diagnostics.
pub fn check_source(source_code: &str, source_path: &Path, config: &Config) -> CheckOutcome {
    let mut warnings = Vec::new();

    let mut outcome = match run_frontend(source_code, source_path, config, &mut warnings) {
        Ok(BorrowOutcome { report, errors }) => CheckOutcome {
            messages: CompilerMessages { errors, warnings },
            report,
        },
        Err(messages) => CheckOutcome::from_messages(messages),
    };

    if !config.output.show_warnings {
        outcome.messages.warnings.clear();
    }

    outcome
}

fn run_frontend(
    source_code: &str,
    source_path: &Path,
    config: &Config,
    warnings: &mut Vec<CompilerWarning>,
) -> Result<BorrowOutcome, CompilerMessages> {
    let mut frontend = CompilerFrontend::new(config, StringTable::new(), source_path);

    let time = Instant::now();
    let tokens = frontend
        .source_to_tokens(source_code)
        .map_err(CompilerMessages::from_error)?;
    timer_log!(time, "Tokenized in: ");

    let time = Instant::now();
    let ast = frontend.tokens_to_ast(tokens).map_err(CompilerMessages::from_error)?;
    let type_table = frontend
        .collect_types(&ast)
        .map_err(CompilerMessages::from_error)?;
    timer_log!(time, "AST created in: ");

    let time = Instant::now();
    let hir_module = frontend.generate_hir(&ast, &type_table, warnings)?;
    timer_log!(time, "HIR generated in: ");

    let time = Instant::now();
    let outcome = frontend.check_borrows(&hir_module, &type_table);
    timer_log!(time, "Borrow checking completed in: ");

    Ok(outcome)
}

#[cfg(test)]
#[path = "tests/check_tests.rs"]
mod tests;
