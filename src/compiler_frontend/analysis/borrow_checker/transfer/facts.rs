//! Per-statement permission facts.
//!
//! After each statement, records the permissions of every binding in scope and of
//! what each reference binding points to. This is the permission table tutorials
//! draw next to each line of a snippet.

use crate::compiler_frontend::analysis::borrow_checker::places::PlaceElem;
use crate::compiler_frontend::analysis::borrow_checker::state::BorrowState;
use crate::compiler_frontend::analysis::borrow_checker::types::{
    PlacePermissionFact, StatementFact,
};
use crate::compiler_frontend::ast::ast_nodes::Ty;
use crate::compiler_frontend::hir::hir_nodes::{DerefKind, HirStatementKind};

use super::FunctionTransfer;

fn statement_kind_name(kind: &HirStatementKind) -> &'static str {
    match kind {
        HirStatementKind::EnterScope(_) => "enter scope",
        HirStatementKind::ExitScope(_) => "exit scope",
        HirStatementKind::Let { .. } => "let",
        HirStatementKind::Assign { .. } => "assign",
        HirStatementKind::CompoundAssign { .. } => "compound assign",
        HirStatementKind::Expression(_) => "expression",
        HirStatementKind::Return(_) => "return",
        HirStatementKind::If { .. } => "if",
        HirStatementKind::Else => "else",
        HirStatementKind::EndIf => "end if",
    }
}

impl FunctionTransfer<'_, '_> {
    pub(super) fn record_statement_fact(&mut self, kind: &HirStatementKind, state: &BorrowState) {
        // Scope entry and branch markers change nothing worth showing
        if matches!(
            kind,
            HirStatementKind::EnterScope(_) | HirStatementKind::Else | HirStatementKind::EndIf
        ) {
            return;
        }

        let function = self.layout.function;
        let mut places = Vec::new();

        for local in state.locals_in_scope() {
            let hir_local = function.local(local);
            if hir_local.synthetic {
                continue;
            }

            let root = self.tables.places.root(local);
            places.push(PlacePermissionFact {
                place: self.diagnostics.place_name(root, &self.tables.places),
                permissions: state.permissions(root, self.layout, &self.tables).to_string(),
            });

            if let Ty::Reference { mutable, .. } = &hir_local.ty {
                let deref = if *mutable {
                    DerefKind::Unique
                } else {
                    DerefKind::Shared
                };
                let target = self.tables.places.child(root, PlaceElem::Deref(deref));
                places.push(PlacePermissionFact {
                    place: self.diagnostics.place_name(target, &self.tables.places),
                    permissions: state.permissions(target, self.layout, &self.tables).to_string(),
                });
            }
        }

        let fact = StatementFact {
            point: self.point,
            statement: statement_kind_name(kind),
            line: self.location.start_pos.line_number,
            places,
            live_loans: state.live_loans().map(|(loan, _)| loan.index()).collect(),
        };
        self.tables.facts.push(fact);
    }
}
