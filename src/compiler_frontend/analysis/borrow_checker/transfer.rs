//! Statement transfer rules.
//!
//! Walks a function body once, in program point order. Each statement first
//! expires the loans nobody will use again, then applies its own reads, moves,
//! borrows and writes. `if`/`else` arms are walked one after the other from the
//! same starting state and joined at `EndIf`.

mod access;
mod call_semantics;
mod facts;

use crate::borrow_log;
use crate::compiler_frontend::analysis::borrow_checker::diagnostics::{Access, BorrowDiagnostics};
use crate::compiler_frontend::analysis::borrow_checker::ownership::ReleaseKind;
use crate::compiler_frontend::analysis::borrow_checker::places::{PlaceElem, PlaceTree};
use crate::compiler_frontend::analysis::borrow_checker::state::{
    BorrowState, FunctionLayout, FunctionTables, LoanOrigin, LoanSet,
};
use crate::compiler_frontend::analysis::borrow_checker::types::{
    FunctionReturnAliasSummary, ReleaseEvent, ReleaseEventKind,
};
use crate::compiler_frontend::ast::ast_nodes::Ty;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::TypeTable;
use crate::compiler_frontend::hir::hir_nodes::{
    BorrowKind, DerefKind, HirExpression, HirStatementKind, LocalId, ProgramPoint, ScopeId,
};
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::settings::RestorationMode;

pub(super) struct BorrowTransferContext<'a> {
    pub type_table: &'a TypeTable,
    pub string_table: &'a StringTable,

    // Indexed by FunctionId
    pub return_aliases: &'a [FunctionReturnAliasSummary],
    pub restoration: RestorationMode,
    pub literal_index_disjointness: bool,
    pub collect_facts: bool,
}

/// What walking one function produced. The tables are kept even when
/// the walk stopped at an error, so the summary shows how far it got.
pub(super) struct FunctionTransferResult {
    pub tables: FunctionTables,
    pub statements_analyzed: usize,
    pub error: Option<CompilerError>,
}

// The state an `if` started from, and the end state of its `then` arm once the `else` begins
struct BranchFrame {
    before: BorrowState,
    then_state: Option<BorrowState>,
}

pub(super) fn transfer_function(
    context: &BorrowTransferContext<'_>,
    layout: &FunctionLayout<'_>,
) -> FunctionTransferResult {
    let mut transfer = FunctionTransfer {
        context,
        layout,
        diagnostics: BorrowDiagnostics::new(layout.function, context.string_table),
        tables: FunctionTables::new(PlaceTree::new(context.literal_index_disjointness)),
        point: 0,
        location: layout.function.location,
    };

    let mut statements_analyzed = 0;
    let error = transfer.walk(&mut statements_analyzed).err();

    FunctionTransferResult {
        tables: transfer.tables,
        statements_analyzed,
        error,
    }
}

pub(super) struct FunctionTransfer<'c, 'a> {
    context: &'c BorrowTransferContext<'a>,
    layout: &'c FunctionLayout<'a>,
    diagnostics: BorrowDiagnostics<'a>,
    tables: FunctionTables,

    // The statement being transferred
    point: ProgramPoint,
    location: TextLocation,
}

impl<'c, 'a> FunctionTransfer<'c, 'a> {
    fn walk(&mut self, statements_analyzed: &mut usize) -> Result<(), CompilerError> {
        let mut state = BorrowState::default();
        self.enter_params(&mut state);

        let mut branches: Vec<BranchFrame> = Vec::new();
        let layout = self.layout;

        for (point, statement) in layout.function.statements().iter().enumerate() {
            self.point = point;
            self.location = statement.location;

            match &statement.kind {
                HirStatementKind::If { condition } => {
                    if !state.diverged {
                        self.expire_loans(&mut state);
                        self.eval(condition, &mut state)?;
                    }
                    branches.push(BranchFrame {
                        before: state.clone(),
                        then_state: None,
                    });
                }

                HirStatementKind::Else => {
                    if let Some(frame) = branches.last_mut() {
                        let then_state = std::mem::replace(&mut state, frame.before.clone());
                        frame.then_state = Some(then_state);
                    }
                }

                HirStatementKind::EndIf => {
                    if let Some(frame) = branches.pop()
                        && let Some(then_state) = frame.then_state
                    {
                        state.join(&then_state);
                    }
                }

                kind => {
                    if state.diverged {
                        continue;
                    }
                    self.expire_loans(&mut state);
                    self.transfer_statement(kind, &mut state)?;
                }
            }

            if state.diverged {
                continue;
            }

            *statements_analyzed += 1;
            self.record_last_uses(&state);
            self.tables.max_live_loans = self.tables.max_live_loans.max(state.live_count());

            if self.context.collect_facts {
                self.record_statement_fact(&statement.kind, &state);
            }
        }

        Ok(())
    }

    /// Parameters start owned. A parameter that holds references holds whatever
    /// the caller lent it, which lives past the end of the function.
    fn enter_params(&mut self, state: &mut BorrowState) {
        let function = self.layout.function;

        for local in &function.params {
            let root = self.tables.places.root(*local);
            state.ownership.bind(root, &self.tables.places);
            state.enter(*local);

            if !self.layout.holds_loans(*local) {
                continue;
            }

            let hir_local = function.local(*local);
            let (place, kind) = match &hir_local.ty {
                Ty::Reference { mutable, .. } => {
                    let (deref, kind) = if *mutable {
                        (DerefKind::Unique, BorrowKind::Unique)
                    } else {
                        (DerefKind::Shared, BorrowKind::Shared)
                    };
                    (self.tables.places.child(root, PlaceElem::Deref(deref)), kind)
                }
                _ => (root, BorrowKind::Shared),
            };

            let index = hir_local.param_index.unwrap_or_default();
            let loan = self.tables.new_loan(
                place,
                kind,
                LoanOrigin::Parameter(index),
                0,
                hir_local.location,
                Vec::new(),
            );
            state.set_holdings(*local, LoanSet::from([loan]));
        }
    }

    /// Ends every loan whose holders are all dead at this point.
    /// In lexical mode a holder stays alive until its scope ends.
    fn expire_loans(&mut self, state: &mut BorrowState) {
        let expired = state
            .live_loans()
            .map(|(loan, _)| loan)
            .filter(|loan| {
                let mut holders = state.holders_of(*loan);
                match self.context.restoration {
                    RestorationMode::LastUse => !holders.any(|holder| {
                        self.layout.liveness.is_live(holder, self.point)
                    }),
                    RestorationMode::Lexical => holders.next().is_none(),
                }
            })
            .collect::<Vec<_>>();

        for loan in expired {
            state.end_loan(loan);
            self.tables.record_end(loan, self.point);
            borrow_log!(
                "{}: loan#{} of '{}' ended at {}",
                self.diagnostics.function_name(),
                loan.0,
                self.diagnostics.place_name(self.tables.loan(loan).place, &self.tables.places),
                self.point
            );
        }
    }

    fn transfer_statement(
        &mut self,
        kind: &HirStatementKind,
        state: &mut BorrowState,
    ) -> Result<(), CompilerError> {
        match kind {
            HirStatementKind::EnterScope(_) => {}

            HirStatementKind::ExitScope(scope) => self.exit_scope(*scope, state)?,

            HirStatementKind::Let { local, value } => {
                let root = self.tables.places.root(*local);
                match value {
                    Some(value) => {
                        let loans = self.eval(value, state)?;
                        state.ownership.bind(root, &self.tables.places);
                        state.set_holdings(*local, loans);
                    }
                    None => {
                        state.ownership.bind_uninitialized(
                            root,
                            self.point,
                            self.location,
                            &self.tables.places,
                        );
                        state.set_holdings(*local, LoanSet::new());
                    }
                }
                state.enter(*local);
            }

            HirStatementKind::Assign { target, value } => {
                let loans = self.eval(value, state)?;
                let place = self.access_place(target, state)?;
                let location = value.location;

                if self.tables.places.is_root(place) {
                    self.check_root_assign(place, state, location)?;
                    state.ownership.reinitialize(place, &self.tables.places);
                    state.set_holdings(target.root, loans);
                } else {
                    self.check_projected_assign(place, state, location)?;
                    state.ownership.reinitialize(place, &self.tables.places);
                    state.add_holdings(target.root, loans);
                }
            }

            HirStatementKind::CompoundAssign { target, value } => {
                self.eval(value, state)?;
                let place = self.access_place(target, state)?;
                self.check_initialized(place, state, Access::Write, value.location)?;
                self.check_write(place, state, Access::Write, value.location)?;
            }

            HirStatementKind::Expression(value) => {
                self.eval(value, state)?;
            }

            HirStatementKind::Return(value) => self.transfer_return(value.as_ref(), state)?,

            // Branch markers are handled by the walk
            HirStatementKind::If { .. } | HirStatementKind::Else | HirStatementKind::EndIf => {}
        }

        Ok(())
    }

    /// Locals of the scope die here. A loan of one of them that someone
    /// outside the scope still uses would dangle.
    fn exit_scope(&mut self, scope: ScopeId, state: &mut BorrowState) -> Result<(), CompilerError> {
        let dying = self
            .layout
            .locals_of_scope(scope)
            .iter()
            .copied()
            .filter(|local| state.is_in_scope(*local))
            .collect::<Vec<_>>();

        if dying.is_empty() {
            return Ok(());
        }

        for local in &dying {
            state.set_holdings(*local, LoanSet::new());
        }
        self.expire_loans(state);

        let dangling = state.live_loans().map(|(loan, _)| self.tables.loan(loan)).find(|loan| {
            loan.origin == LoanOrigin::Local
                && dying.contains(&self.tables.places.root_local(loan.place))
        });
        if let Some(loan) = dangling {
            return Err(self.diagnostics.does_not_live_long_enough(
                loan,
                &self.tables.places,
                self.location,
                self.point,
            ));
        }

        self.release_locals(&dying, state);
        for local in &dying {
            state.leave(*local, &self.tables.places);
        }

        Ok(())
    }

    fn transfer_return(
        &mut self,
        value: Option<&HirExpression>,
        state: &mut BorrowState,
    ) -> Result<(), CompilerError> {
        let loans = match value {
            Some(value) => self.eval(value, state)?,
            None => LoanSet::new(),
        };
        let location = value.map(|value| value.location).unwrap_or(self.location);

        if self.layout.returns_reference {
            for loan in &loans {
                let loan = self.tables.loan(*loan);
                match loan.origin {
                    LoanOrigin::Local => {
                        return Err(self.diagnostics.returns_local_reference(
                            loan,
                            &self.tables.places,
                            location,
                            self.point,
                        ));
                    }
                    LoanOrigin::Parameter(index)
                        if !self.layout.return_alias.allows_param(index) =>
                    {
                        return Err(self
                            .diagnostics
                            .parameter_does_not_flow(index, location, self.point));
                    }
                    LoanOrigin::Parameter(_) | LoanOrigin::Reborrow => {}
                }
            }
        }

        let in_scope = state.locals_in_scope().collect::<Vec<_>>();
        self.release_locals(&in_scope, state);

        let live = state.live_loans().map(|(loan, _)| loan).collect::<Vec<_>>();
        for loan in live {
            state.end_loan(loan);
            self.tables.record_end(loan, self.point);
        }

        state.diverged = true;
        Ok(())
    }

    /// Releases owned values in reverse declaration order
    fn release_locals(&mut self, locals: &[LocalId], state: &mut BorrowState) {
        let roots = locals
            .iter()
            .rev()
            .filter(|local| {
                self.layout.owns_resources(**local)
                    && !self.layout.function.local(**local).synthetic
            })
            .map(|local| self.tables.places.root(*local))
            .collect::<Vec<_>>();

        for (root, kind) in state.ownership.drop_scope(&roots, &self.tables.places) {
            let place = self.diagnostics.place_name(root, &self.tables.places);
            borrow_log!("{}: release '{place}' at {}", self.diagnostics.function_name(), self.point);

            self.tables.releases.push(ReleaseEvent {
                place,
                kind: match kind {
                    ReleaseKind::Full => ReleaseEventKind::Full,
                    ReleaseKind::RemainingFields => ReleaseEventKind::RemainingFields,
                },
                point: self.point,
                line: self.location.start_pos.line_number,
            });
        }
    }

    fn record_last_uses(&mut self, state: &BorrowState) {
        let point = self.point;

        for (loan, _) in state.live_loans() {
            let used_now = state
                .holders_of(loan)
                .any(|holder| self.layout.liveness.uses_of(holder).binary_search(&point).is_ok());
            let created_now = self.tables.loan(loan).created_at == point;

            if used_now || created_now {
                self.tables.last_use[loan.index()] = Some(point);
            }
        }
    }
}
