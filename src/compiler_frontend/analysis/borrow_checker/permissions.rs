//! Read, Write, Own and Flow permissions.
//!
//! A place's permissions at a point are its declared baseline minus what the
//! live loans overlapping it take away. Nothing is ever handed back by hand:
//! once a loan leaves the live set, recomputing gives the baseline again.

use crate::compiler_frontend::analysis::borrow_checker::places::{PlaceElem, PlaceId, PlaceTree};
use crate::compiler_frontend::hir::hir_nodes::{DerefKind, HirFunction};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct PermissionSet(u8);

impl PermissionSet {
    pub(crate) const NONE: Self = Self(0);
    pub(crate) const READ: Self = Self(0b0001);
    pub(crate) const WRITE: Self = Self(0b0010);
    pub(crate) const OWN: Self = Self(0b0100);
    pub(crate) const FLOW: Self = Self(0b1000);

    pub(crate) fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub(crate) fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub(crate) fn remove(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (Self::READ, 'R'),
            (Self::WRITE, 'W'),
            (Self::OWN, 'O'),
            (Self::FLOW, 'F'),
        ];

        for (flag, letter) in flags {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            } else {
                write!(f, "-")?;
            }
        }

        Ok(())
    }
}

/// What a live loan takes away from every place it overlaps
pub(crate) fn loan_restriction(unique: bool, downgraded: bool) -> PermissionSet {
    if unique && !downgraded {
        PermissionSet::READ
            .union(PermissionSet::WRITE)
            .union(PermissionSet::OWN)
    } else {
        PermissionSet::WRITE.union(PermissionSet::OWN)
    }
}

/// Permissions a place has when nothing borrows it and nothing was moved.
///
/// Write needs a `mut` binding, or a path through `&mut` that no `&` comes before.
/// Own is lost behind any reference and on indexing, since neither can be moved out of.
pub(crate) fn baseline(
    place: PlaceId,
    places: &PlaceTree,
    function: &HirFunction,
) -> PermissionSet {
    let mut writable = function.local(places.root_local(place)).mutable;
    let mut behind_shared = false;
    let mut ownable = true;

    for elem in places.projections(place) {
        match elem {
            PlaceElem::Deref(DerefKind::Unique) => {
                writable = !behind_shared;
                ownable = false;
            }
            PlaceElem::Deref(DerefKind::Shared) => {
                writable = false;
                behind_shared = true;
                ownable = false;
            }
            PlaceElem::Deref(DerefKind::Boxed) => {}
            PlaceElem::Index(_) => ownable = false,
            PlaceElem::Field(_) | PlaceElem::Root(_) => {}
        }
    }

    let mut permissions = PermissionSet::READ;
    if writable {
        permissions = permissions.union(PermissionSet::WRITE);
    }
    if ownable {
        permissions = permissions.union(PermissionSet::OWN);
    }
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_sets_display_as_fixed_columns() {
        let read_own = PermissionSet::READ.union(PermissionSet::OWN);
        assert_eq!(read_own.to_string(), "R-O-");
        assert_eq!(PermissionSet::NONE.to_string(), "----");
    }

    #[test]
    fn a_downgraded_unique_loan_restricts_like_a_shared_one() {
        let shared = loan_restriction(false, false);
        let downgraded = loan_restriction(true, true);
        let unique = loan_restriction(true, false);

        assert_eq!(shared, downgraded);
        assert!(unique.contains(downgraded));
        assert!(!downgraded.contains(PermissionSet::READ));
    }

    #[test]
    fn removing_is_idempotent() {
        let all = PermissionSet::READ
            .union(PermissionSet::WRITE)
            .union(PermissionSet::OWN);
        let restriction = loan_restriction(false, false);

        assert_eq!(all.remove(restriction), all.remove(restriction).remove(restriction));
        assert_eq!(all.remove(restriction), PermissionSet::READ);
    }
}
