//! Expression evaluation and the access checks behind it.
//!
//! Evaluating an expression applies its reads, moves and borrows in order and
//! returns the loans its value carries. A reference value carries the loan it
//! was created from; a copy of a reference carries whatever its source holds.

use crate::borrow_log;
use crate::compiler_frontend::analysis::borrow_checker::diagnostics::Access;
use crate::compiler_frontend::analysis::borrow_checker::ownership::OwnershipState;
use crate::compiler_frontend::analysis::borrow_checker::permissions::{PermissionSet, baseline};
use crate::compiler_frontend::analysis::borrow_checker::places::PlaceId;
use crate::compiler_frontend::analysis::borrow_checker::state::{BorrowState, LoanOrigin, LoanSet};
use crate::compiler_frontend::ast::ast_nodes::Ty;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::hir::hir_nodes::{
    BorrowKind, DerefKind, HirExpression, HirExpressionKind, HirPlace, IndexOperand, Projection,
};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;

use super::FunctionTransfer;

impl FunctionTransfer<'_, '_> {
    pub(super) fn eval(
        &mut self,
        expression: &HirExpression,
        state: &mut BorrowState,
    ) -> Result<LoanSet, CompilerError> {
        let location = expression.location;

        match &expression.kind {
            HirExpressionKind::Literal | HirExpressionKind::StrLiteral => Ok(LoanSet::new()),

            HirExpressionKind::Copy(place) => {
                let id = self.access_place(place, state)?;
                self.check_read(id, state, Access::Read, location)?;
                Ok(self.carried(place, &expression.ty, state))
            }

            HirExpressionKind::Read(place) => {
                let id = self.access_place(place, state)?;
                self.check_read(id, state, Access::Read, location)?;
                Ok(LoanSet::new())
            }

            HirExpressionKind::Move(place) => {
                let id = self.access_place(place, state)?;
                self.check_move(id, state, location)?;

                let loans = self.carried(place, &expression.ty, state);
                state
                    .ownership
                    .move_out(id, self.point, location, &self.tables.places);

                borrow_log!(
                    "{}: moved '{}' at {}",
                    self.diagnostics.function_name(),
                    self.diagnostics.place_name(id, &self.tables.places),
                    self.point
                );
                Ok(loans)
            }

            HirExpressionKind::Borrow { place, kind } => self.borrow(place, *kind, state, location),

            // The temporary holds whatever its value holds
            HirExpressionKind::BorrowTemporary(inner) => self.eval(inner, state),

            HirExpressionKind::Call {
                function,
                args,
                two_phase,
                returns_reference,
            } => self.eval_call(*function, args, *two_phase, *returns_reference, state),

            HirExpressionKind::Aggregate(items) => {
                let mut loans = LoanSet::new();
                for item in items {
                    loans.extend(self.eval(item, state)?);
                }
                Ok(loans)
            }

            HirExpressionKind::Format(items) => {
                for item in items {
                    self.eval(item, state)?;
                }
                Ok(LoanSet::new())
            }

            HirExpressionKind::Binary { left, right, .. } => {
                self.eval(left, state)?;
                self.eval(right, state)?;
                Ok(LoanSet::new())
            }

            HirExpressionKind::Unary { value, .. } | HirExpressionKind::Cast(value) => {
                self.eval(value, state)?;
                Ok(LoanSet::new())
            }

            HirExpressionKind::Project(inner) => {
                let loans = self.eval(inner, state)?;
                if self.context.type_table.contains_reference(&expression.ty) {
                    Ok(loans)
                } else {
                    Ok(LoanSet::new())
                }
            }
        }
    }

    /// Evaluates the index operands a place needs, then interns it
    pub(super) fn access_place(
        &mut self,
        place: &HirPlace,
        state: &mut BorrowState,
    ) -> Result<PlaceId, CompilerError> {
        for projection in &place.projections {
            if let Projection::Index(IndexOperand::Dynamic(operands)) = projection {
                for operand in operands {
                    self.eval(operand, state)?;
                }
            }
        }

        Ok(self.tables.places.resolve(place))
    }

    // A value that can hold references keeps its root's loans alive
    fn carried(&self, place: &HirPlace, ty: &Ty, state: &BorrowState) -> LoanSet {
        if self.context.type_table.contains_reference(ty) {
            state.holdings(place.root)
        } else {
            LoanSet::new()
        }
    }

    pub(super) fn check_initialized(
        &self,
        place: PlaceId,
        state: &BorrowState,
        access: Access,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        let query = state.ownership.query(place, &self.tables.places);
        if query.state == OwnershipState::Owned {
            return Ok(());
        }

        Err(self.diagnostics.use_of_moved_value(
            place,
            &query,
            access,
            &self.tables.places,
            location,
            self.point,
        ))
    }

    /// Reads need the value to be there and no live `&mut` of it
    pub(super) fn check_read(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        access: Access,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        self.check_initialized(place, state, access, location)?;

        let mut checked = 0;
        let conflict = state
            .overlapping_loans(place, &self.tables)
            .inspect(|_| checked += 1)
            .find(|(loan, downgraded)| loan.is_unique() && !downgraded)
            .map(|(loan, _)| loan.clone());
        self.tables.conflicts_checked += checked;

        match conflict {
            Some(loan) => Err(self.diagnostics.conflicting_borrow(
                place,
                access,
                &loan,
                &self.tables.places,
                location,
                self.point,
            )),
            None => Ok(()),
        }
    }

    /// Writes need the place to be writable at all, then no live loan of it
    pub(super) fn check_write(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        access: Access,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        self.check_permission(place, state, access, PermissionSet::WRITE, location)
    }

    pub(super) fn check_move(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        self.check_initialized(place, state, Access::Move, location)?;
        self.check_permission(place, state, Access::Move, PermissionSet::OWN, location)
    }

    fn check_permission(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        access: Access,
        needed: PermissionSet,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        let declared = baseline(place, &self.tables.places, self.layout.function);
        if !declared.contains(needed) {
            return Err(self.diagnostics.missing_permission(
                place,
                access,
                declared,
                &self.tables.places,
                location,
                self.point,
            ));
        }

        self.tables.conflicts_checked += 1;
        let blocking = state
            .overlapping_loans(place, &self.tables)
            .next()
            .map(|(loan, _)| loan.clone());

        match blocking {
            Some(loan) => {
                let held = state.permissions(place, self.layout, &self.tables);
                Err(self.diagnostics.borrowed_while_writing(
                    place,
                    access,
                    held,
                    &loan,
                    &self.tables.places,
                    location,
                    self.point,
                ))
            }
            None => Ok(()),
        }
    }

    /// `x = value`. An uninitialized binding can be assigned once without `mut`.
    pub(super) fn check_root_assign(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        if state.ownership.state(place, &self.tables.places) == OwnershipState::Uninitialized {
            return Ok(());
        }
        self.check_write(place, state, Access::Write, location)
    }

    /// `x.field = value` needs `x` itself to still be there, the field may be moved
    pub(super) fn check_projected_assign(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        let query = state.ownership.query(place, &self.tables.places);
        let ancestor_gone = matches!(
            query.state,
            OwnershipState::Moved | OwnershipState::Uninitialized
        ) && query.place.is_some_and(|moved| moved != place);

        if ancestor_gone {
            return Err(self.diagnostics.use_of_moved_value(
                place,
                &query,
                Access::Write,
                &self.tables.places,
                location,
                self.point,
            ));
        }

        self.check_write(place, state, Access::Write, location)
    }

    /// Creates a loan of the place.
    ///
    /// Borrowing through a reference also carries the loans that reference holds.
    /// A shared borrow through `&mut` downgrades the unique loans it came from
    /// to read only for as long as they live.
    fn borrow(
        &mut self,
        place: &HirPlace,
        kind: BorrowKind,
        state: &mut BorrowState,
        location: TextLocation,
    ) -> Result<LoanSet, CompilerError> {
        let id = self.access_place(place, state)?;

        match kind {
            BorrowKind::Shared => self.check_read(id, state, Access::SharedBorrow, location)?,
            BorrowKind::Unique => self.check_unique_borrow(id, state, location)?,
        }

        let through_reference = self.tables.places.has_reference_deref(id);
        let inherited = if through_reference {
            state.holdings(place.root)
        } else {
            LoanSet::new()
        };

        let mut derived_from = Vec::new();
        if kind == BorrowKind::Shared
            && self.tables.places.last_reference_deref(id) == Some(DerefKind::Unique)
        {
            derived_from = inherited
                .iter()
                .copied()
                .filter(|loan| state.is_live(*loan) && self.tables.loan(*loan).is_unique())
                .collect();

            for loan in &derived_from {
                state.downgrade(*loan);
                self.tables.ever_downgraded[loan.index()] = true;
            }
        }

        let origin = if through_reference {
            LoanOrigin::Reborrow
        } else {
            LoanOrigin::Local
        };

        let loan = self
            .tables
            .new_loan(id, kind, origin, self.point, location, derived_from);
        state.activate(loan);

        borrow_log!(
            "{}: loan#{} {:?} of '{}' at {}",
            self.diagnostics.function_name(),
            loan.0,
            kind,
            self.diagnostics.place_name(id, &self.tables.places),
            self.point
        );

        let mut loans = inherited;
        loans.insert(loan);
        Ok(loans)
    }

    fn check_unique_borrow(
        &mut self,
        place: PlaceId,
        state: &BorrowState,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        self.check_initialized(place, state, Access::UniqueBorrow, location)?;

        let declared = baseline(place, &self.tables.places, self.layout.function);
        if !declared.contains(PermissionSet::WRITE) {
            return Err(self.diagnostics.missing_permission(
                place,
                Access::UniqueBorrow,
                declared,
                &self.tables.places,
                location,
                self.point,
            ));
        }

        let mut checked = 0;
        let conflict = state
            .overlapping_loans(place, &self.tables)
            .inspect(|_| checked += 1)
            .next()
            .map(|(loan, _)| loan.clone());
        self.tables.conflicts_checked += checked.max(1);

        match conflict {
            Some(loan) => Err(self.diagnostics.conflicting_borrow(
                place,
                Access::UniqueBorrow,
                &loan,
                &self.tables.places,
                location,
                self.point,
            )),
            None => Ok(()),
        }
    }
}
