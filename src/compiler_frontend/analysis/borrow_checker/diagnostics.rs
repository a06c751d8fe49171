//! Error builders for the five ownership diagnostics.
//!
//! Every builder fills in the place, the program point and, where one exists,
//! the related point that explains the error (where the value was moved or
//! where the conflicting loan was created).

use crate::compiler_frontend::analysis::borrow_checker::ownership::{
    MoveKind, OwnershipQuery, OwnershipState,
};
use crate::compiler_frontend::analysis::borrow_checker::permissions::PermissionSet;
use crate::compiler_frontend::analysis::borrow_checker::places::{PlaceId, PlaceTree};
use crate::compiler_frontend::analysis::borrow_checker::state::Loan;
use crate::compiler_frontend::compiler_errors::{CompilerError, RelatedPoint};
use crate::compiler_frontend::hir::hir_nodes::{
    BorrowKind, DerefKind, HirFunction, LocalId, ProgramPoint,
};
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::new_compiler_error;

/// What the failing operation was trying to do with the place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Access {
    Read,
    Move,
    SharedBorrow,
    UniqueBorrow,
    Write,
}

impl Access {
    fn verb(self) -> &'static str {
        match self {
            Access::Read => "use",
            Access::Move => "move out of",
            Access::SharedBorrow => "borrow",
            Access::UniqueBorrow => "borrow as mutable",
            Access::Write => "assign to",
        }
    }

    fn needed(self) -> &'static str {
        match self {
            Access::Read | Access::SharedBorrow => "R",
            Access::Move => "O",
            Access::UniqueBorrow | Access::Write => "W",
        }
    }
}

pub(super) struct BorrowDiagnostics<'a> {
    function: &'a HirFunction,
    string_table: &'a StringTable,
}

impl<'a> BorrowDiagnostics<'a> {
    pub(super) fn new(function: &'a HirFunction, string_table: &'a StringTable) -> Self {
        Self {
            function,
            string_table,
        }
    }

    pub(super) fn local_name(&self, local: LocalId) -> String {
        self.string_table
            .resolve(self.function.local(local).name)
            .to_owned()
    }

    pub(super) fn function_name(&self) -> &str {
        &self.function.display_name
    }

    pub(super) fn place_name(&self, place: PlaceId, places: &PlaceTree) -> String {
        places.display(place, self.function, self.string_table)
    }

    fn finish(&self, error: CompilerError, place: String, point: ProgramPoint) -> CompilerError {
        error
            .with_function(self.function.display_name.clone())
            .with_place(place)
            .with_point(point)
    }

    pub(super) fn use_of_moved_value(
        &self,
        place: PlaceId,
        query: &OwnershipQuery,
        access: Access,
        places: &PlaceTree,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let name = self.place_name(place, places);
        let moved = query
            .place
            .map(|moved| self.place_name(moved, places))
            .unwrap_or_else(|| name.clone());

        let uninitialized = query
            .record
            .is_some_and(|record| record.kind == MoveKind::Uninitialized);

        let (msg, note, suggestion) = if uninitialized {
            (
                format!("Used binding '{moved}' before it was initialized"),
                format!("'{moved}' is declared here without a value"),
                format!("Assign a value to '{moved}' on every path before this {}", access.verb()),
            )
        } else if query.state == OwnershipState::PartiallyMoved {
            (
                format!("Cannot {} '{name}' because part of it was moved: '{moved}'", access.verb()),
                format!("'{moved}' was moved here"),
                String::from("Use the fields that were not moved one by one, or clone before moving"),
            )
        } else {
            (
                format!("Cannot {} '{name}' because '{moved}' was moved", access.verb()),
                format!("'{moved}' was moved here"),
                format!("Borrow '{moved}' instead of moving it, or clone it before the move"),
            )
        };

        let mut error = new_compiler_error!(UseOfMovedValue, msg, location, {
            CompilationStage => "Borrow Checking",
            VariableName => name.clone(),
            MovedVariable => moved,
            PrimarySuggestion => suggestion,
        });

        if let Some(record) = query.record {
            error = error.with_related(RelatedPoint {
                point: Some(record.at),
                location: record.location,
                note,
            });
        }

        self.finish(error, name, point)
    }

    pub(super) fn conflicting_borrow(
        &self,
        place: PlaceId,
        access: Access,
        loan: &Loan,
        places: &PlaceTree,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let name = self.place_name(place, places);
        let borrowed = self.place_name(loan.place, places);
        let (held, held_kind) = match loan.kind {
            BorrowKind::Shared => ("immutable", "Shared"),
            BorrowKind::Unique => ("mutable", "Unique"),
        };

        let msg = match access {
            Access::UniqueBorrow => format!(
                "Cannot borrow '{name}' as mutable because it is also borrowed as {held}"
            ),
            Access::SharedBorrow => format!(
                "Cannot borrow '{name}' as immutable because it is also borrowed as {held}"
            ),
            _ => format!("Cannot {} '{name}' because it was mutably borrowed", access.verb()),
        };

        let error = new_compiler_error!(ConflictingBorrow, msg, location, {
            CompilationStage => "Borrow Checking",
            VariableName => name.clone(),
            BorrowedVariable => borrowed.clone(),
            BorrowKind => held_kind,
            PrimarySuggestion => format!("Move the last use of the borrow of '{borrowed}' before this point"),
        })
        .with_related(RelatedPoint {
            point: Some(loan.created_at),
            location: loan.location,
            note: format!("'{borrowed}' is borrowed as {held} here, and the borrow is used later"),
        });

        self.finish(error, name, point)
    }

    /// The place never had the permission: an immutable binding or a path behind `&`
    pub(super) fn missing_permission(
        &self,
        place: PlaceId,
        access: Access,
        held: PermissionSet,
        places: &PlaceTree,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let name = self.place_name(place, places);
        let behind_shared = places.last_reference_deref(place) == Some(DerefKind::Shared);
        let behind_reference = places.has_reference_deref(place);
        let root = self.local_name(places.root_local(place));

        let (msg, suggestion) = match access {
            Access::Move if behind_reference => (
                format!("Cannot move out of '{name}', which is behind a reference"),
                String::from("Clone the value, or borrow it instead of moving it"),
            ),
            Access::Move => (
                format!("Cannot move out of '{name}', values cannot be moved out of an index"),
                String::from("Borrow the element, or clone it"),
            ),
            Access::UniqueBorrow if behind_shared => (
                format!("Cannot borrow '{name}' as mutable, as it is behind a '&' reference"),
                String::from("Take a '&mut' reference instead of '&'"),
            ),
            Access::UniqueBorrow => (
                format!("Cannot borrow '{name}' as mutable, as '{root}' is not declared as mutable"),
                format!("Declare it as 'let mut {root}'"),
            ),
            Access::Write if behind_shared => (
                format!("Cannot assign to '{name}', which is behind a '&' reference"),
                String::from("Take a '&mut' reference instead of '&'"),
            ),
            Access::Write if places.is_root(place) => (
                format!("Cannot assign twice to immutable variable '{name}'"),
                format!("Declare it as 'let mut {root}'"),
            ),
            _ => (
                format!("Cannot {} '{name}', as '{root}' is not declared as mutable", access.verb()),
                format!("Declare it as 'let mut {root}'"),
            ),
        };

        let error = new_compiler_error!(WriteWithoutPermission, msg, location, {
            CompilationStage => "Borrow Checking",
            VariableName => name.clone(),
            PermissionsHeld => held.to_string(),
            PermissionsNeeded => access.needed(),
            PrimarySuggestion => suggestion,
        });

        self.finish(error, name, point)
    }

    /// The place has the permission, but a live loan took it away
    pub(super) fn borrowed_while_writing(
        &self,
        place: PlaceId,
        access: Access,
        held: PermissionSet,
        loan: &Loan,
        places: &PlaceTree,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let name = self.place_name(place, places);
        let borrowed = self.place_name(loan.place, places);

        let error = new_compiler_error!(
            WriteWithoutPermission,
            format!("Cannot {} '{name}' because it is borrowed", access.verb()),
            location,
            {
                CompilationStage => "Borrow Checking",
                VariableName => name.clone(),
                BorrowedVariable => borrowed.clone(),
                PermissionsHeld => held.to_string(),
                PermissionsNeeded => access.needed(),
                PrimarySuggestion => format!("Finish using the borrow of '{borrowed}' before this point"),
            }
        )
        .with_related(RelatedPoint {
            point: Some(loan.created_at),
            location: loan.location,
            note: format!("'{borrowed}' is borrowed here, and the borrow is used later"),
        });

        self.finish(error, name, point)
    }

    /// A referent goes out of scope while a loan of it is still used
    pub(super) fn does_not_live_long_enough(
        &self,
        loan: &Loan,
        places: &PlaceTree,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let referent = self.local_name(places.root_local(loan.place));
        let borrowed = self.place_name(loan.place, places);

        let error = new_compiler_error!(
            DanglingReference,
            format!("'{referent}' does not live long enough"),
            location,
            {
                CompilationStage => "Borrow Checking",
                VariableName => referent.clone(),
                BorrowedVariable => borrowed.clone(),
                LifetimeHint => format!("'{referent}' is dropped here while a borrow of it is still in use"),
                PrimarySuggestion => format!("Declare '{referent}' in an outer scope, or stop using the borrow before this block ends"),
            }
        )
        .with_related(RelatedPoint {
            point: Some(loan.created_at),
            location: loan.location,
            note: format!("'{borrowed}' is borrowed here"),
        });

        self.finish(error, referent, point)
    }

    pub(super) fn returns_local_reference(
        &self,
        loan: &Loan,
        places: &PlaceTree,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let referent = self.local_name(places.root_local(loan.place));
        let borrowed = self.place_name(loan.place, places);

        let error = new_compiler_error!(
            DanglingReference,
            format!(
                "Cannot return a reference to '{borrowed}', which is owned by '{}'",
                self.function.display_name
            ),
            location,
            {
                CompilationStage => "Borrow Checking",
                VariableName => referent.clone(),
                BorrowedVariable => borrowed.clone(),
                LifetimeHint => format!("'{referent}' is dropped when the function returns"),
                PrimarySuggestion => "Return an owned value instead of a reference",
            }
        )
        .with_related(RelatedPoint {
            point: Some(loan.created_at),
            location: loan.location,
            note: format!("'{borrowed}' is borrowed here"),
        });

        self.finish(error, referent, point)
    }

    /// A parameter's loan reaches the result but the signature does not tie it to the output
    pub(super) fn parameter_does_not_flow(
        &self,
        param_index: usize,
        location: TextLocation,
        point: ProgramPoint,
    ) -> CompilerError {
        let param = self
            .function
            .params
            .get(param_index)
            .map(|local| self.local_name(*local))
            .unwrap_or_else(|| String::from("_"));

        let error = new_compiler_error!(
            DanglingReference,
            format!(
                "Lifetime may not live long enough: '{}' returns data borrowed from '{param}', but the signature does not tie '{param}' to the result",
                self.function.display_name
            ),
            location,
            {
                CompilationStage => "Borrow Checking",
                VariableName => param.clone(),
                PermissionsNeeded => "F",
                LifetimeHint => format!("'{param}' lacks the Flow permission for the returned value"),
                PrimarySuggestion => format!("Give '{param}' the same lifetime parameter as the return type"),
            }
        );

        self.finish(error, param, point)
    }
}
