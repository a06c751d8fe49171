use crate::compiler_frontend::analysis::borrow_checker::liveness::Liveness;
use crate::compiler_frontend::analysis::borrow_checker::ownership::{
    OwnershipState, OwnershipTracker,
};
use crate::compiler_frontend::analysis::borrow_checker::permissions::{
    PermissionSet, baseline, loan_restriction,
};
use crate::compiler_frontend::analysis::borrow_checker::places::{PlaceId, PlaceTree};
use crate::compiler_frontend::analysis::borrow_checker::types::{
    FunctionReturnAliasSummary, ReleaseEvent, StatementFact,
};
use crate::compiler_frontend::datatypes::TypeTable;
use crate::compiler_frontend::hir::hir_nodes::{
    BorrowKind, HirFunction, LocalId, ProgramPoint, ScopeId,
};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Facts about one function that never change while it is checked
#[derive(Debug)]
pub(super) struct FunctionLayout<'a> {
    pub function: &'a HirFunction,
    pub liveness: Liveness,
    pub scope_locals: FxHashMap<ScopeId, Vec<LocalId>>,
    pub return_alias: FunctionReturnAliasSummary,
    pub returns_reference: bool,

    // Indexed by LocalId
    pub local_is_copy: Vec<bool>,
    pub local_holds_loans: Vec<bool>,
    pub local_is_reference: Vec<bool>,
}

impl<'a> FunctionLayout<'a> {
    pub(super) fn new(
        function: &'a HirFunction,
        type_table: &TypeTable,
        return_alias: FunctionReturnAliasSummary,
    ) -> Self {
        let mut scope_locals: FxHashMap<ScopeId, Vec<LocalId>> = FxHashMap::default();
        for local in &function.locals {
            scope_locals.entry(local.scope).or_default().push(local.id);
        }

        Self {
            function,
            liveness: Liveness::compute(function.statements()),
            scope_locals,
            return_alias,
            returns_reference: type_table.contains_reference(&function.signature.return_type),
            local_is_copy: function
                .locals
                .iter()
                .map(|local| type_table.is_copy(&local.ty))
                .collect(),
            local_holds_loans: function
                .locals
                .iter()
                .map(|local| type_table.contains_reference(&local.ty))
                .collect(),
            local_is_reference: function
                .locals
                .iter()
                .map(|local| local.ty.is_reference())
                .collect(),
        }
    }

    pub(super) fn locals_of_scope(&self, scope: ScopeId) -> &[LocalId] {
        self.scope_locals
            .get(&scope)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(super) fn is_copy(&self, local: LocalId) -> bool {
        self.local_is_copy[local.0 as usize]
    }

    pub(super) fn holds_loans(&self, local: LocalId) -> bool {
        self.local_holds_loans[local.0 as usize]
    }

    pub(super) fn is_reference(&self, local: LocalId) -> bool {
        self.local_is_reference[local.0 as usize]
    }

    /// Locals whose value is released when they go out of scope
    pub(super) fn owns_resources(&self, local: LocalId) -> bool {
        !self.is_copy(local) && !self.is_reference(local)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(super) struct LoanId(pub u32);

impl LoanId {
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LoanOrigin {
    // Borrows a place owned by a local of this function
    Local,

    // Borrows through a reference, so the data lives somewhere else
    Reborrow,

    // Whatever the caller lent parameter `n`
    Parameter(usize),
}

#[derive(Debug, Clone)]
pub(super) struct Loan {
    pub id: LoanId,
    pub place: PlaceId,
    pub kind: BorrowKind,
    pub origin: LoanOrigin,
    pub created_at: ProgramPoint,
    pub location: TextLocation,
    pub derived_from: Vec<LoanId>,
}

impl Loan {
    pub(super) fn is_unique(&self) -> bool {
        self.kind == BorrowKind::Unique
    }
}

/// Everything about a function's analysis that is shared by all branches
#[derive(Debug)]
pub(super) struct FunctionTables {
    pub places: PlaceTree,
    pub loans: Vec<Loan>,
    pub ended_at: Vec<Option<ProgramPoint>>,
    pub last_use: Vec<Option<ProgramPoint>>,
    pub ever_downgraded: Vec<bool>,
    pub releases: Vec<ReleaseEvent>,
    pub facts: Vec<StatementFact>,
    pub max_live_loans: usize,
    pub conflicts_checked: usize,
}

impl FunctionTables {
    pub(super) fn new(places: PlaceTree) -> Self {
        Self {
            places,
            loans: Vec::new(),
            ended_at: Vec::new(),
            last_use: Vec::new(),
            ever_downgraded: Vec::new(),
            releases: Vec::new(),
            facts: Vec::new(),
            max_live_loans: 0,
            conflicts_checked: 0,
        }
    }

    pub(super) fn new_loan(
        &mut self,
        place: PlaceId,
        kind: BorrowKind,
        origin: LoanOrigin,
        created_at: ProgramPoint,
        location: TextLocation,
        derived_from: Vec<LoanId>,
    ) -> LoanId {
        let id = LoanId(self.loans.len() as u32);
        self.loans.push(Loan {
            id,
            place,
            kind,
            origin,
            created_at,
            location,
            derived_from,
        });
        self.ended_at.push(None);
        self.last_use.push(None);
        self.ever_downgraded.push(false);
        id
    }

    pub(super) fn loan(&self, id: LoanId) -> &Loan {
        &self.loans[id.index()]
    }

    pub(super) fn record_end(&mut self, id: LoanId, at: ProgramPoint) {
        self.ended_at[id.index()] = Some(at);
    }
}

pub(super) type LoanSet = BTreeSet<LoanId>;

/// The part of the analysis that differs between branches.
/// Ordered collections keep diagnostics and facts deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct BorrowState {
    // Live loans and whether they were downgraded to read only
    live: BTreeMap<LoanId, bool>,
    holdings: BTreeMap<LocalId, LoanSet>,
    in_scope: BTreeSet<LocalId>,
    pub ownership: OwnershipTracker,

    // Every path so far has returned
    pub diverged: bool,
}

impl BorrowState {
    pub(super) fn activate(&mut self, loan: LoanId) {
        self.live.insert(loan, false);
    }

    pub(super) fn is_live(&self, loan: LoanId) -> bool {
        self.live.contains_key(&loan)
    }

    pub(super) fn live_loans(&self) -> impl Iterator<Item = (LoanId, bool)> + '_ {
        self.live.iter().map(|(loan, downgraded)| (*loan, *downgraded))
    }

    pub(super) fn live_count(&self) -> usize {
        self.live.len()
    }

    pub(super) fn end_loan(&mut self, loan: LoanId) -> bool {
        self.live.remove(&loan).is_some()
    }

    pub(super) fn downgrade(&mut self, loan: LoanId) {
        if let Some(downgraded) = self.live.get_mut(&loan) {
            *downgraded = true;
        }
    }

    pub(super) fn holdings(&self, local: LocalId) -> LoanSet {
        self.holdings.get(&local).cloned().unwrap_or_default()
    }

    pub(super) fn holders_of(&self, loan: LoanId) -> impl Iterator<Item = LocalId> + '_ {
        self.holdings
            .iter()
            .filter(move |(_, loans)| loans.contains(&loan))
            .map(|(local, _)| *local)
    }

    pub(super) fn set_holdings(&mut self, local: LocalId, loans: LoanSet) {
        if loans.is_empty() {
            self.holdings.remove(&local);
        } else {
            self.holdings.insert(local, loans);
        }
    }

    pub(super) fn add_holdings(&mut self, local: LocalId, loans: LoanSet) {
        if !loans.is_empty() {
            self.holdings.entry(local).or_default().extend(loans);
        }
    }

    pub(super) fn enter(&mut self, local: LocalId) {
        self.in_scope.insert(local);
    }

    pub(super) fn leave(&mut self, local: LocalId, places: &PlaceTree) {
        self.in_scope.remove(&local);
        self.holdings.remove(&local);
        self.ownership.forget_local(local, places);
    }

    pub(super) fn is_in_scope(&self, local: LocalId) -> bool {
        self.in_scope.contains(&local)
    }

    pub(super) fn locals_in_scope(&self) -> impl Iterator<Item = LocalId> + '_ {
        self.in_scope.iter().copied()
    }

    /// Live loans that overlap `place`, with their downgrade flag
    pub(super) fn overlapping_loans<'s>(
        &'s self,
        place: PlaceId,
        tables: &'s FunctionTables,
    ) -> impl Iterator<Item = (&'s Loan, bool)> + 's {
        self.live_loans()
            .map(|(id, downgraded)| (tables.loan(id), downgraded))
            .filter(move |(loan, _)| tables.places.overlaps(loan.place, place))
    }

    /// Baseline minus what ownership and the live loans take away
    pub(super) fn permissions(
        &self,
        place: PlaceId,
        layout: &FunctionLayout<'_>,
        tables: &FunctionTables,
    ) -> PermissionSet {
        let mut permissions = baseline(place, &tables.places, layout.function);

        match self.ownership.state(place, &tables.places) {
            OwnershipState::Moved | OwnershipState::Uninitialized => return PermissionSet::NONE,
            OwnershipState::PartiallyMoved => {
                permissions = permissions.remove(PermissionSet::READ.union(PermissionSet::OWN));
            }
            OwnershipState::Owned => {}
        }

        for (loan, downgraded) in self.overlapping_loans(place, tables) {
            permissions = permissions.remove(loan_restriction(loan.is_unique(), downgraded));
        }

        if self.can_flow(tables.places.root_local(place), layout, tables) {
            permissions = permissions.union(PermissionSet::FLOW);
        }

        permissions
    }

    /// A reference may leave the function when it only holds what the
    /// caller lent to parameters the signature ties to the result
    pub(super) fn can_flow(
        &self,
        local: LocalId,
        layout: &FunctionLayout<'_>,
        tables: &FunctionTables,
    ) -> bool {
        if !layout.returns_reference {
            return false;
        }

        let Some(loans) = self.holdings.get(&local) else {
            return false;
        };

        loans.iter().all(|loan| match tables.loan(*loan).origin {
            LoanOrigin::Parameter(index) => layout.return_alias.allows_param(index),
            LoanOrigin::Local | LoanOrigin::Reborrow => false,
        })
    }

    /// Merges the state at the end of the other arm of a branch.
    /// Anything live, held or moved on either side stays that way.
    pub(super) fn join(&mut self, other: &BorrowState) {
        if other.diverged {
            return;
        }
        if self.diverged {
            *self = other.clone();
            return;
        }

        for (loan, downgraded) in &other.live {
            let entry = self.live.entry(*loan).or_insert(false);
            *entry |= *downgraded;
        }
        for (local, loans) in &other.holdings {
            self.holdings.entry(*local).or_default().extend(loans.iter().copied());
        }
        self.in_scope.extend(other.in_scope.iter().copied());
        self.ownership.join(&other.ownership);
    }
}
