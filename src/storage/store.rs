use crate::ring::{Entry, Identifier};

use dashmap::DashMap;
use std::collections::HashSet;

/// Local entry store: `Identifier -> set of Entry`.
///
/// Every operation on a single identifier runs under that identifier's shard
/// lock, which linearizes concurrent inserts and removes for it.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: DashMap<Identifier, HashSet<Entry>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns `true` if the entry was not present yet.
    pub fn insert(&self, entry: Entry) -> bool {
        self.entries.entry(entry.id).or_default().insert(entry)
    }

    pub fn insert_all(&self, entries: impl IntoIterator<Item = Entry>) -> usize {
        entries
            .into_iter()
            .map(|entry| self.insert(entry))
            .filter(|added| *added)
            .count()
    }

    /// Exact-match removal. Removing an absent entry is a no-op.
    pub fn remove(&self, entry: &Entry) -> bool {
        let removed = match self.entries.get_mut(&entry.id) {
            Some(mut set) => set.remove(entry),
            None => false,
        };
        if removed {
            self.entries.remove_if(&entry.id, |_, set| set.is_empty());
        }
        removed
    }

    pub fn remove_all<'a>(&self, entries: impl IntoIterator<Item = &'a Entry>) -> usize {
        entries
            .into_iter()
            .filter(|entry| self.remove(entry))
            .count()
    }

    /// Every entry stored under `id`; empty when there are none.
    pub fn retrieve(&self, id: Identifier) -> HashSet<Entry> {
        self.entries
            .get(&id)
            .map(|set| set.clone())
            .unwrap_or_default()
    }

    /// Entries whose identifier lies in the clockwise interval `(from, to]`.
    pub fn entries_in_interval(&self, from: Identifier, to: Identifier) -> HashSet<Entry> {
        self.entries
            .iter()
            .filter(|set| set.key().is_between_right_inclusive(from, to))
            .flat_map(|set| set.value().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Drops every entry whose identifier lies in `(from, to]`.
    pub fn remove_interval(&self, from: Identifier, to: Identifier) -> usize {
        let mut removed = 0;
        self.entries.retain(|id, set| {
            if id.is_between_right_inclusive(from, to) {
                removed += set.len();
                false
            } else {
                true
            }
        });
        removed
    }

    /// Makes the contents of `(from, to]` exactly `entries`. Entries outside
    /// the interval are ignored. Returns `(added, removed)`.
    pub fn replace_interval(
        &self,
        from: Identifier,
        to: Identifier,
        entries: HashSet<Entry>,
    ) -> (usize, usize) {
        let stale: Vec<Entry> = self
            .entries_in_interval(from, to)
            .into_iter()
            .filter(|entry| !entries.contains(entry))
            .collect();
        let removed = self.remove_all(stale.iter());
        let added = self.insert_all(
            entries
                .into_iter()
                .filter(|entry| entry.id.is_between_right_inclusive(from, to)),
        );
        (added, removed)
    }

    pub fn all(&self) -> HashSet<Entry> {
        self.entries
            .iter()
            .flat_map(|set| set.value().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Number of entries across all identifiers.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|set| set.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identifier_count(&self) -> usize {
        self.entries.len()
    }
}
