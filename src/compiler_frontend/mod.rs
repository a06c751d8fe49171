pub(crate) mod ast;
pub(crate) mod tokenizer;

pub(crate) mod compiler_messages {
    pub(crate) mod compiler_dev_logging;
    pub(crate) mod compiler_errors;
    pub(crate) mod compiler_warnings;
    pub(crate) mod display_messages;
}
pub(crate) use compiler_messages::compiler_errors;
pub(crate) use compiler_messages::compiler_warnings;
pub(crate) use compiler_messages::display_messages;
pub(crate) mod datatypes;
pub(crate) mod string_interning;

pub(crate) mod hir;

pub(crate) mod analysis;

use crate::compiler_frontend::analysis::borrow_checker::{
    BorrowOutcome, check_borrows as run_borrow_checker,
};
use crate::compiler_frontend::ast::ast_nodes::Ast;
use crate::compiler_frontend::ast::parser::parse_ast;
use crate::compiler_frontend::ast::prelude::parse_prelude;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::datatypes::TypeTable;
use crate::compiler_frontend::hir::hir_builder::lower_module;
use crate::compiler_frontend::hir::hir_nodes::HirModule;
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::compiler_frontend::tokenizer::tokens::FileTokens;
use crate::settings::Config;
use std::path::{Path, PathBuf};

/// Flags change the behavior of a single check.
/// For the built-in CLI these are added as cli flags, and they win over the config file.
#[derive(PartialEq, Debug, Clone)]
pub enum Flag {
    DisableWarnings,
    DisableTimers,
    ShowFacts,
    Json,
    Lexical,
}

pub struct CompilerFrontend<'a> {
    pub(crate) config: &'a Config,
    pub(crate) string_table: StringTable,
    pub(crate) source_path: PathBuf,
}

impl<'a> CompilerFrontend<'a> {
    pub(crate) fn new(config: &'a Config, string_table: StringTable, source_path: &Path) -> Self {
        Self {
            config,
            string_table,
            source_path: source_path.to_path_buf(),
        }
    }

    /// -----------------------------
    /// TOKENIZER
    /// -----------------------------
    pub fn source_to_tokens(&mut self, source_code: &str) -> Result<FileTokens, CompilerError> {
        match tokenize(source_code, &mut self.string_table) {
            Ok(tokens) => Ok(tokens),
            Err(e) => Err(e.with_file_path(self.source_path.to_owned())),
        }
    }

    /// -----------------------------
    /// AST CREATION
    /// -----------------------------
    /// The snippet is parsed on its own, then merged after the prelude
    /// so every function sees the same standard declarations.
    pub fn tokens_to_ast(&mut self, tokens: FileTokens) -> Result<Ast, CompilerError> {
        let mut ast = parse_prelude(&mut self.string_table)?;

        match parse_ast(tokens, &mut self.string_table, false) {
            Ok(snippet) => ast.merge(snippet),
            Err(e) => return Err(e.with_file_path(self.source_path.to_owned())),
        }

        Ok(ast)
    }

    /// -----------------------------
    /// TYPE COLLECTION
    /// -----------------------------
    /// Which types are copy and what fields each struct has.
    /// The config can name extra copy types the snippet does not declare.
    pub fn collect_types(&mut self, ast: &Ast) -> Result<TypeTable, CompilerError> {
        TypeTable::new(ast, &self.config.types.copy, &mut self.string_table)
            .map_err(|e| e.with_file_path(self.source_path.to_owned()))
    }

    /// -----------------------------
    /// HIR GENERATION
    /// -----------------------------
    /// Resolves names to locals, gives every statement a program point
    /// and flattens blocks and branches into scope and branch markers.
    pub fn generate_hir(
        &mut self,
        ast: &Ast,
        type_table: &TypeTable,
        warnings: &mut Vec<CompilerWarning>,
    ) -> Result<HirModule, CompilerMessages> {
        let lowering = lower_module(ast, type_table, &mut self.string_table, &self.source_path);
        warnings.extend(lowering.warnings);

        if lowering.errors.is_empty() {
            return Ok(lowering.module);
        }

        Err(CompilerMessages {
            errors: lowering.errors,
            warnings: std::mem::take(warnings),
        })
    }

    // ------------------------------
    //  BORROW CHECKING AND ANALYSIS
    // ------------------------------
    // Ownership, borrows and lifetimes are checked per function.
    // Every function with an error contributes exactly one error.
    pub fn check_borrows(&self, hir_module: &HirModule, type_table: &TypeTable) -> BorrowOutcome {
        let mut outcome = run_borrow_checker(
            hir_module,
            type_table,
            &self.string_table,
            &self.config.checker,
            self.config.output.show_facts,
        );

        for error in &mut outcome.errors {
            error.file_path = self.source_path.to_owned();
        }

        outcome
    }
}
