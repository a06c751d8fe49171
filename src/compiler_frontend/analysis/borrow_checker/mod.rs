//! Ownership, borrow and lifetime checking over HIR.
//!
//! Every user function is checked on its own: signature lifetimes are resolved
//! for the whole module first, then each body is walked once with its own state.
//! The first error in a function ends that function's analysis. Other functions
//! are still checked, in parallel when the settings allow it.

mod diagnostics;
mod lifetimes;
mod liveness;
mod ownership;
mod permissions;
mod places;
mod state;
mod transfer;
mod types;

#[cfg(test)]
mod tests;

pub use types::{
    BorrowCheckReport, BorrowCheckStats, FunctionBorrowSummary, FunctionReturnAliasSummary,
    LoanEvent, LoanKindName, PlacePermissionFact, ReleaseEvent, ReleaseEventKind, StatementFact,
};

use crate::borrow_log;
use crate::compiler_frontend::analysis::borrow_checker::lifetimes::resolve_return_alias;
use crate::compiler_frontend::analysis::borrow_checker::state::{FunctionLayout, LoanOrigin};
use crate::compiler_frontend::analysis::borrow_checker::transfer::{
    BorrowTransferContext, FunctionTransferResult, transfer_function,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::TypeTable;
use crate::compiler_frontend::hir::hir_nodes::{BorrowKind, HirFunction, HirModule};
use crate::compiler_frontend::string_interning::StringTable;
use crate::settings::CheckerSettings;
use rayon::prelude::*;

/// The report plus every error found, in function declaration order
#[derive(Debug, Default)]
pub struct BorrowOutcome {
    pub report: BorrowCheckReport,
    pub errors: Vec<CompilerError>,
}

pub(crate) fn check_borrows(
    module: &HirModule,
    type_table: &TypeTable,
    string_table: &StringTable,
    settings: &CheckerSettings,
    collect_facts: bool,
) -> BorrowOutcome {
    BorrowChecker::new(module, type_table, string_table, settings, collect_facts).run()
}

struct BorrowChecker<'a> {
    module: &'a HirModule,
    type_table: &'a TypeTable,
    string_table: &'a StringTable,
    settings: &'a CheckerSettings,
    collect_facts: bool,
}

struct FunctionOutcome {
    summary: FunctionBorrowSummary,
    statements_analyzed: usize,
    conflicts_checked: usize,
    error: Option<CompilerError>,
}

impl<'a> BorrowChecker<'a> {
    fn new(
        module: &'a HirModule,
        type_table: &'a TypeTable,
        string_table: &'a StringTable,
        settings: &'a CheckerSettings,
        collect_facts: bool,
    ) -> Self {
        Self {
            module,
            type_table,
            string_table,
            settings,
            collect_facts,
        }
    }

    fn run(self) -> BorrowOutcome {
        // Call sites need every callee's summary, so signatures are resolved up front
        let resolved = self
            .module
            .functions
            .iter()
            .map(|function| resolve_return_alias(function, self.type_table, self.string_table))
            .collect::<Vec<_>>();
        let return_aliases = resolved
            .iter()
            .map(|(summary, _)| summary.clone())
            .collect::<Vec<_>>();

        let context = BorrowTransferContext {
            type_table: self.type_table,
            string_table: self.string_table,
            return_aliases: &return_aliases,
            restoration: self.settings.restoration,
            literal_index_disjointness: self.settings.literal_index_disjointness,
            collect_facts: self.collect_facts,
        };

        let user_functions = self.module.checked_functions().collect::<Vec<_>>();

        let check = |function: &&HirFunction| {
            let (alias, lifetime_error) = &resolved[function.id.0 as usize];
            self.check_function(&context, function, alias.clone(), lifetime_error.clone())
        };

        // Collecting keeps declaration order however the work was scheduled
        let outcomes = if self.settings.parallel {
            user_functions.par_iter().map(check).collect::<Vec<_>>()
        } else {
            user_functions.iter().map(check).collect::<Vec<_>>()
        };

        let mut outcome = BorrowOutcome::default();

        for function_outcome in outcomes {
            let stats = &mut outcome.report.stats;
            stats.functions_analyzed += 1;
            stats.statements_analyzed += function_outcome.statements_analyzed;
            stats.loans_created += function_outcome.summary.loans_created;
            stats.conflicts_checked += function_outcome.conflicts_checked;

            if let Some(error) = function_outcome.error {
                stats.functions_with_errors += 1;
                outcome.errors.push(error);
            }
            outcome.report.functions.push(function_outcome.summary);
        }

        borrow_log!(
            "Completed borrow checking: functions={} statements={} loans={} facts={} errors={}",
            outcome.report.stats.functions_analyzed,
            outcome.report.stats.statements_analyzed,
            outcome.report.stats.loans_created,
            outcome.report.total_facts(),
            outcome.errors.len()
        );

        outcome
    }

    /// Body errors come first. A signature that cannot be resolved is only
    /// reported when the body itself is clean.
    fn check_function(
        &self,
        context: &BorrowTransferContext<'_>,
        function: &HirFunction,
        return_alias: FunctionReturnAliasSummary,
        lifetime_error: Option<CompilerError>,
    ) -> FunctionOutcome {
        if function.body.is_none() {
            return FunctionOutcome {
                summary: empty_summary(function, return_alias, lifetime_error.is_some()),
                statements_analyzed: 0,
                conflicts_checked: 0,
                error: lifetime_error,
            };
        }

        let layout = FunctionLayout::new(function, self.type_table, return_alias.clone());
        let FunctionTransferResult {
            tables,
            statements_analyzed,
            error,
        } = transfer_function(context, &layout);

        let error = error.or(lifetime_error);
        let loans = tables
            .loans
            .iter()
            .map(|loan| LoanEvent {
                id: loan.id.index(),
                place: tables.places.display(loan.place, function, self.string_table),
                kind: match loan.kind {
                    BorrowKind::Shared => LoanKindName::Shared,
                    BorrowKind::Unique => LoanKindName::Unique,
                },
                origin: match loan.origin {
                    LoanOrigin::Local => String::from("local"),
                    LoanOrigin::Reborrow => String::from("reborrow"),
                    LoanOrigin::Parameter(index) => format!("parameter {index}"),
                },
                created_at: loan.created_at,
                line: loan.location.start_pos.line_number,
                last_use: tables.last_use[loan.id.index()],
                ended_at: tables.ended_at[loan.id.index()],
                downgraded: tables.ever_downgraded[loan.id.index()],
                derived_from: loan.derived_from.iter().map(|parent| parent.index()).collect(),
            })
            .collect::<Vec<_>>();

        let loans_created = tables
            .loans
            .iter()
            .filter(|loan| !matches!(loan.origin, LoanOrigin::Parameter(_)))
            .count();

        FunctionOutcome {
            summary: FunctionBorrowSummary {
                name: function.display_name.clone(),
                loans_created,
                max_live_loans: tables.max_live_loans,
                return_alias,
                releases: tables.releases,
                loans,
                facts: tables.facts,
                has_error: error.is_some(),
            },
            statements_analyzed,
            conflicts_checked: tables.conflicts_checked,
            error,
        }
    }
}

fn empty_summary(
    function: &HirFunction,
    return_alias: FunctionReturnAliasSummary,
    has_error: bool,
) -> FunctionBorrowSummary {
    FunctionBorrowSummary {
        name: function.display_name.clone(),
        loans_created: 0,
        max_live_loans: 0,
        return_alias,
        releases: Vec::new(),
        loans: Vec::new(),
        facts: Vec::new(),
        has_error,
    }
}
