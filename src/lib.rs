//! permcheck checks the ownership, borrowing and lifetime rules of small Rust snippets.
//!
//! A snippet goes through the tokenizer, parser and HIR lowering before the borrow checker
//! resolves places, tracks ownership and permissions, and checks that no reference outlives
//! its referent.

pub mod settings;

pub(crate) mod compiler_frontend;
pub mod projects;

pub(crate) mod build_system {
    pub(crate) mod check;
}

pub(crate) mod compiler_tests {
    pub(crate) mod integration_test_runner;
}

pub use build_system::check::{CheckOutcome, check_file, check_source};
pub use compiler_frontend::Flag;
pub use compiler_frontend::analysis::borrow_checker::{
    BorrowCheckReport, BorrowCheckStats, FunctionBorrowSummary, FunctionReturnAliasSummary,
    LoanEvent, LoanKindName, PlacePermissionFact, ReleaseEvent, ReleaseEventKind, StatementFact,
};
pub use compiler_frontend::compiler_errors::{
    CompilerError, CompilerMessages, ErrorMetaDataKey, ErrorType, error_type_from_str,
    error_type_to_str,
};
pub use compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
pub use compiler_tests::integration_test_runner::{
    CaseResult, TestSummary, collect_cases, expected_error, run_all_test_cases, run_case,
};
pub use settings::{Config, OutputFormat, RestorationMode};
