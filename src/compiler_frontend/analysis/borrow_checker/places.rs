//! Canonical places.
//!
//! Every place a function touches is interned into one arena tree: roots are
//! locals and each child is one projection of its parent. Two uses of `v[2]`
//! get the same `PlaceId`, so ownership records and loans can be keyed by id.

use crate::compiler_frontend::hir::hir_nodes::{
    DerefKind, HirFunction, HirPlace, IndexOperand, LocalId, Projection,
};
use crate::compiler_frontend::string_interning::{StringId, StringTable};
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PlaceId(pub u32);

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "place#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PlaceElem {
    Root(LocalId),
    Deref(DerefKind),
    Field(StringId),

    // None is an index that is not a literal
    Index(Option<i64>),
}

#[derive(Debug, Clone)]
struct PlaceNode {
    elem: PlaceElem,
    parent: Option<PlaceId>,
    root: LocalId,
}

#[derive(Debug, Clone)]
pub(crate) struct PlaceTree {
    nodes: Vec<PlaceNode>,
    lookup: FxHashMap<(Option<PlaceId>, PlaceElem), PlaceId>,
    literal_index_disjointness: bool,
}

impl PlaceTree {
    pub(crate) fn new(literal_index_disjointness: bool) -> Self {
        Self {
            nodes: Vec::new(),
            lookup: FxHashMap::default(),
            literal_index_disjointness,
        }
    }

    pub(crate) fn root(&mut self, local: LocalId) -> PlaceId {
        self.intern(None, PlaceElem::Root(local), local)
    }

    pub(crate) fn child(&mut self, parent: PlaceId, elem: PlaceElem) -> PlaceId {
        let root = self.root_local(parent);
        self.intern(Some(parent), elem, root)
    }

    fn intern(&mut self, parent: Option<PlaceId>, elem: PlaceElem, root: LocalId) -> PlaceId {
        if let Some(id) = self.lookup.get(&(parent, elem)) {
            return *id;
        }

        let id = PlaceId(self.nodes.len() as u32);
        self.nodes.push(PlaceNode { elem, parent, root });
        self.lookup.insert((parent, elem), id);
        id
    }

    /// Interns a HIR place. Index operands only matter for whether they are literals.
    pub(crate) fn resolve(&mut self, place: &HirPlace) -> PlaceId {
        let mut id = self.root(place.root);

        for projection in &place.projections {
            let elem = match projection {
                Projection::Deref(kind) => PlaceElem::Deref(*kind),
                Projection::Field(field) => PlaceElem::Field(*field),
                Projection::Index(IndexOperand::Constant(value)) => PlaceElem::Index(Some(*value)),
                Projection::Index(IndexOperand::Dynamic(_)) => PlaceElem::Index(None),
            };
            id = self.child(id, elem);
        }

        id
    }

    pub(crate) fn root_local(&self, place: PlaceId) -> LocalId {
        self.nodes[place.0 as usize].root
    }

    pub(crate) fn parent(&self, place: PlaceId) -> Option<PlaceId> {
        self.nodes[place.0 as usize].parent
    }

    pub(crate) fn elem(&self, place: PlaceId) -> PlaceElem {
        self.nodes[place.0 as usize].elem
    }

    pub(crate) fn is_root(&self, place: PlaceId) -> bool {
        self.parent(place).is_none()
    }

    /// Root first, `place` last
    pub(crate) fn path(&self, place: PlaceId) -> Vec<PlaceId> {
        let mut path = Vec::new();
        let mut current = Some(place);
        while let Some(id) = current {
            path.push(id);
            current = self.parent(id);
        }
        path.reverse();
        path
    }

    /// Projection elements from the root down, without the root itself
    pub(crate) fn projections(&self, place: PlaceId) -> Vec<PlaceElem> {
        self.path(place)
            .into_iter()
            .skip(1)
            .map(|id| self.elem(id))
            .collect()
    }

    /// True when `ancestor` is `place` or one of its parents
    pub(crate) fn is_prefix_of(&self, ancestor: PlaceId, place: PlaceId) -> bool {
        let mut current = Some(place);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether two places may name the same memory.
    /// One path being a prefix of the other overlaps. Indices that are not
    /// both literals are assumed to overlap.
    pub(crate) fn overlaps(&self, left: PlaceId, right: PlaceId) -> bool {
        if self.root_local(left) != self.root_local(right) {
            return false;
        }

        let left_path = self.path(left);
        let right_path = self.path(right);

        for (left_id, right_id) in left_path.iter().zip(&right_path).skip(1) {
            if left_id == right_id {
                continue;
            }

            match (self.elem(*left_id), self.elem(*right_id)) {
                (PlaceElem::Index(Some(a)), PlaceElem::Index(Some(b))) => {
                    if self.literal_index_disjointness && a != b {
                        return false;
                    }
                }
                (PlaceElem::Index(_), PlaceElem::Index(_)) => {}
                _ => return false,
            }
        }

        true
    }

    /// Whether the path goes through a `&` or `&mut` dereference
    pub(crate) fn has_reference_deref(&self, place: PlaceId) -> bool {
        self.projections(place).iter().any(|elem| {
            matches!(
                elem,
                PlaceElem::Deref(DerefKind::Shared) | PlaceElem::Deref(DerefKind::Unique)
            )
        })
    }

    /// The last reference dereference on the path, if any
    pub(crate) fn last_reference_deref(&self, place: PlaceId) -> Option<DerefKind> {
        self.projections(place)
            .into_iter()
            .rev()
            .find_map(|elem| match elem {
                PlaceElem::Deref(kind @ (DerefKind::Shared | DerefKind::Unique)) => Some(kind),
                _ => None,
            })
    }

    /// Renders a place the way it is written in source, like `v[2]`, `*r` or `(*self).name`
    pub(crate) fn display(
        &self,
        place: PlaceId,
        function: &HirFunction,
        string_table: &StringTable,
    ) -> String {
        let mut text = string_table.resolve(function.local(self.root_local(place)).name).to_owned();
        let mut starts_with_deref = false;

        for elem in self.projections(place) {
            match elem {
                PlaceElem::Root(_) => {}
                PlaceElem::Deref(_) => {
                    text = format!("*{text}");
                    starts_with_deref = true;
                }
                PlaceElem::Field(field) => {
                    if starts_with_deref {
                        text = format!("({text})");
                    }
                    text = format!("{text}.{}", string_table.resolve(field));
                    starts_with_deref = false;
                }
                PlaceElem::Index(index) => {
                    if starts_with_deref {
                        text = format!("({text})");
                    }
                    match index {
                        Some(value) => text = format!("{text}[{value}]"),
                        None => text = format!("{text}[_]"),
                    }
                    starts_with_deref = false;
                }
            }
        }

        text
    }
}
