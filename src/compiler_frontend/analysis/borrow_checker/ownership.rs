//! Ownership tracking per place.
//!
//! Only the places that lost their value are recorded. A place is moved when it
//! or one of its ancestors has a record, and partially moved when only some of
//! its descendants do.

use crate::compiler_frontend::analysis::borrow_checker::places::{PlaceId, PlaceTree};
use crate::compiler_frontend::hir::hir_nodes::{LocalId, ProgramPoint};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OwnershipState {
    Owned,
    Moved,
    PartiallyMoved,
    Uninitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveKind {
    Moved,

    // Declared with `let x;` and not assigned yet
    Uninitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MoveRecord {
    pub kind: MoveKind,
    pub at: ProgramPoint,
    pub location: TextLocation,
}

/// What an ownership query found, with the record that explains it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OwnershipQuery {
    pub state: OwnershipState,
    pub place: Option<PlaceId>,
    pub record: Option<MoveRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleaseKind {
    Full,
    RemainingFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct OwnershipTracker {
    records: BTreeMap<PlaceId, MoveRecord>,
}

impl OwnershipTracker {
    pub(crate) fn query(&self, place: PlaceId, places: &PlaceTree) -> OwnershipQuery {
        for ancestor in places.path(place) {
            if let Some(record) = self.records.get(&ancestor) {
                let state = match record.kind {
                    MoveKind::Moved => OwnershipState::Moved,
                    MoveKind::Uninitialized => OwnershipState::Uninitialized,
                };
                return OwnershipQuery {
                    state,
                    place: Some(ancestor),
                    record: Some(*record),
                };
            }
        }

        let moved_part = self
            .records
            .iter()
            .find(|(recorded, _)| **recorded != place && places.is_prefix_of(place, **recorded));

        match moved_part {
            Some((recorded, record)) => OwnershipQuery {
                state: OwnershipState::PartiallyMoved,
                place: Some(*recorded),
                record: Some(*record),
            },
            None => OwnershipQuery {
                state: OwnershipState::Owned,
                place: None,
                record: None,
            },
        }
    }

    pub(crate) fn state(&self, place: PlaceId, places: &PlaceTree) -> OwnershipState {
        self.query(place, places).state
    }

    /// A new binding owns its whole value
    pub(crate) fn bind(&mut self, root: PlaceId, places: &PlaceTree) {
        self.clear_subtree(root, places);
    }

    pub(crate) fn bind_uninitialized(
        &mut self,
        root: PlaceId,
        at: ProgramPoint,
        location: TextLocation,
        places: &PlaceTree,
    ) {
        self.clear_subtree(root, places);
        self.records.insert(
            root,
            MoveRecord {
                kind: MoveKind::Uninitialized,
                at,
                location,
            },
        );
    }

    /// Callers check the place is owned first. Moving a whole value
    /// forgets which of its parts were already gone.
    pub(crate) fn move_out(
        &mut self,
        place: PlaceId,
        at: ProgramPoint,
        location: TextLocation,
        places: &PlaceTree,
    ) {
        self.clear_subtree(place, places);
        self.records.insert(
            place,
            MoveRecord {
                kind: MoveKind::Moved,
                at,
                location,
            },
        );
    }

    pub(crate) fn reinitialize(&mut self, place: PlaceId, places: &PlaceTree) {
        self.clear_subtree(place, places);
    }

    /// Releases the given roots as their scope ends.
    /// Moved and never initialized roots release nothing.
    pub(crate) fn drop_scope(
        &mut self,
        roots: &[PlaceId],
        places: &PlaceTree,
    ) -> Vec<(PlaceId, ReleaseKind)> {
        let mut released = Vec::new();

        for root in roots {
            match self.state(*root, places) {
                OwnershipState::Owned => released.push((*root, ReleaseKind::Full)),
                OwnershipState::PartiallyMoved => {
                    released.push((*root, ReleaseKind::RemainingFields))
                }
                OwnershipState::Moved | OwnershipState::Uninitialized => {}
            }
        }

        released
    }

    /// Forgets every record under the root of a local that went out of scope
    pub(crate) fn forget_local(&mut self, local: LocalId, places: &PlaceTree) {
        self.records
            .retain(|place, _| places.root_local(*place) != local);
    }

    /// A place is moved after a branch if either side moved it
    pub(crate) fn join(&mut self, other: &OwnershipTracker) {
        for (place, record) in &other.records {
            self.records.entry(*place).or_insert(*record);
        }
    }

    fn clear_subtree(&mut self, place: PlaceId, places: &PlaceTree) {
        self.records
            .retain(|recorded, _| !places.is_prefix_of(place, *recorded));
    }
}
