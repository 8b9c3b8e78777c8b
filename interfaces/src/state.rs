use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Deserialize;
use serde::Serialize;

use crate::defs::IndexEntry;

/// Dedup key to entry. Append-only: an entry is never replaced or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl ProcessedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Returns false, leaving the stored entry as is, when `key` is already present.
    pub fn insert(&mut self, key: String, entry: IndexEntry) -> bool {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Adds every entry of `other` whose key is not present yet.
    pub fn merge(&mut self, other: &ProcessedIndex) -> usize {
        let mut added = 0;
        for (key, entry) in other.iter() {
            if self.insert(key.clone(), entry.clone()) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, IndexEntry)> for ProcessedIndex {
    fn from_iter<T: IntoIterator<Item = (String, IndexEntry)>>(iter: T) -> Self {
        let mut index = ProcessedIndex::new();
        for (key, entry) in iter {
            index.insert(key, entry);
        }
        index
    }
}
