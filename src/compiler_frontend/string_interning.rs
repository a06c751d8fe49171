use crate::settings::MINIMUM_STRING_TABLE_CAPACITY;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A unique identifier for an interned string, represented as a u32 for memory efficiency.
/// This provides type safety to prevent mixing string IDs with other integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl std::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringId({})", self.0)
    }
}

/// Stores every identifier, lifetime name and string literal once.
///
/// Both directions are shared `Arc<str>` handles so a table can be read
/// from the parallel borrow checking pass without copying it.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<Arc<str>>,
    string_to_id: FxHashMap<Arc<str>, StringId>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            strings: Vec::with_capacity(MINIMUM_STRING_TABLE_CAPACITY),
            string_to_id: FxHashMap::default(),
        }
    }

    /// Intern a string slice, returning its unique ID.
    /// If the string already exists, returns the existing ID.
    #[inline]
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&existing_id) = self.string_to_id.get(s) {
            return existing_id;
        }

        self.intern_new(s)
    }

    #[cold]
    #[inline(never)]
    fn intern_new(&mut self, s: &str) -> StringId {
        let new_id = StringId(self.strings.len() as u32);
        let shared: Arc<str> = Arc::from(s);

        self.strings.push(Arc::clone(&shared));
        self.string_to_id.insert(shared, new_id);

        new_id
    }

    /// Resolve an interned string ID back to its string content.
    ///
    /// IDs are only ever created by this table, so an unknown ID resolves to an empty string.
    #[inline]
    pub fn resolve(&self, id: StringId) -> &str {
        self.strings
            .get(id.0 as usize)
            .map(|s| s.as_ref())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_string_returns_the_same_id() {
        let mut table = StringTable::new();
        let first = table.intern("longest");
        let second = table.intern("longest");
        let other = table.intern("shortest");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(table.resolve(first), "longest");
        assert_eq!(table.resolve(other), "shortest");
    }

    #[test]
    fn an_unknown_id_resolves_to_an_empty_string() {
        let table = StringTable::new();
        assert_eq!(table.resolve(StringId(7)), "");
    }
}
