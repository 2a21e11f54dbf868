//! # Interned Tags
//!
//! Tag strings are interned once per store; entities carry small sorted sets
//! of [`TagId`]s, so membership tests never compare strings.

use std::collections::HashMap;

/// Interned tag handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(u32);

/// String interner for tags.
#[derive(Debug, Default)]
pub struct TagInterner {
    ids: HashMap<String, TagId>,
    names: Vec<String>,
}

impl TagInterner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, interning it on first use.
    pub fn intern(&mut self, name: &str) -> TagId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = TagId(u32::try_from(self.names.len()).unwrap_or(u32::MAX));
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Looks up an already-interned tag without interning it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.ids.get(name).copied()
    }

    /// Returns the string for an interned id.
    #[must_use]
    pub fn name(&self, id: TagId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Number of distinct tags seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Unordered tag membership set, stored sorted for binary search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<TagId>,
}

impl TagSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: TagId) -> bool {
        match self.tags.binary_search(&tag) {
            Ok(_) => false,
            Err(pos) => {
                self.tags.insert(pos, tag);
                true
            }
        }
    }

    /// Removes a tag. Returns `false` if it was absent.
    pub fn remove(&mut self, tag: TagId) -> bool {
        match self.tags.binary_search(&tag) {
            Ok(pos) => {
                self.tags.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, tag: TagId) -> bool {
        self.tags.binary_search(&tag).is_ok()
    }

    /// Iterates tags in interning order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.tags.iter().copied()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if the set holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut interner = TagInterner::new();
        let a = interner.intern("enemy");
        let b = interner.intern("boss");
        assert_eq!(interner.intern("enemy"), a);
        assert_ne!(a, b);
        assert_eq!(interner.name(b), Some("boss"));
        assert_eq!(interner.lookup("missing"), None);
    }

    #[test]
    fn test_tag_set_membership() {
        let mut interner = TagInterner::new();
        let enemy = interner.intern("enemy");
        let boss = interner.intern("boss");

        let mut set = TagSet::new();
        assert!(set.insert(boss));
        assert!(set.insert(enemy));
        assert!(!set.insert(enemy));
        assert!(set.contains(enemy));
        assert_eq!(set.len(), 2);

        assert!(set.remove(boss));
        assert!(!set.contains(boss));
        assert!(!set.remove(boss));
    }
}
