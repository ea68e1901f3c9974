#![forbid(unsafe_code)]

//! Id-keyed object arena.
//!
//! # Role in glkrt
//! Windows, streams and filerefs each live in a [`Registry`]. Callers hold
//! only ids; the registry owns the objects. Every entry carries the caller's
//! rock and, when a dispatch hook is installed, the dispatch rock it returned
//! on registration.
//!
//! Iteration walks entries from the most recently created to the oldest, so
//! `iterate(None)` yields the newest object and each `iterate(Some(id))`
//! steps one object further back.

use std::collections::BTreeMap;

use crate::dispatch::DispatchRock;
use crate::id::{ObjectId, Rock};

/// One registered object.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub rock: Rock,
    pub disprock: Option<DispatchRock>,
    pub value: V,
}

/// Arena of objects keyed by monotonically allocated ids.
#[derive(Debug, Clone)]
pub struct Registry<K: ObjectId, V> {
    entries: BTreeMap<K, Entry<V>>,
    next: Option<K>,
}

impl<K: ObjectId, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ObjectId, V> Registry<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: Some(K::FIRST),
        }
    }

    /// Id the next insert will receive, if any remain.
    #[must_use]
    pub fn peek_next(&self) -> Option<K> {
        self.next
    }

    /// Register `value` and return its fresh id.
    ///
    /// Returns `None` once the id space is exhausted.
    pub fn insert(&mut self, rock: Rock, value: V) -> Option<K> {
        let id = self.next?;
        self.next = id.checked_next();
        self.entries.insert(
            id,
            Entry {
                rock,
                disprock: None,
                value,
            },
        );
        Some(id)
    }

    /// Remove an entry, returning it.
    pub fn remove(&mut self, id: K) -> Option<Entry<V>> {
        self.entries.remove(&id)
    }

    #[must_use]
    pub fn contains(&self, id: K) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: K) -> Option<&V> {
        self.entries.get(&id).map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut V> {
        self.entries.get_mut(&id).map(|entry| &mut entry.value)
    }

    #[must_use]
    pub fn entry(&self, id: K) -> Option<&Entry<V>> {
        self.entries.get(&id)
    }

    pub fn entry_mut(&mut self, id: K) -> Option<&mut Entry<V>> {
        self.entries.get_mut(&id)
    }

    #[must_use]
    pub fn rock(&self, id: K) -> Option<Rock> {
        self.entries.get(&id).map(|entry| entry.rock)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All ids, newest first.
    #[must_use]
    pub fn ids(&self) -> Vec<K> {
        self.entries.keys().rev().copied().collect()
    }

    /// Entry following `after` in iteration order (newest to oldest).
    ///
    /// `None` starts from the newest entry. An `after` that is no longer
    /// registered still resumes from its position.
    #[must_use]
    pub fn iterate(&self, after: Option<K>) -> Option<(K, Rock)> {
        let found = match after {
            None => self.entries.iter().next_back(),
            Some(after) => self.entries.range(..after).next_back(),
        };
        found.map(|(id, entry)| (*id, entry.rock))
    }

    /// Iterate `(id, value)` pairs, newest first.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.entries.iter().rev().map(|(id, entry)| (*id, &entry.value))
    }

    /// Iterate mutable values, newest first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> + '_ {
        self.entries
            .iter_mut()
            .rev()
            .map(|(id, entry)| (*id, &mut entry.value))
    }

    /// Drop every entry, returning them oldest first.
    ///
    /// Id allocation continues from where it was; ids are never reused.
    pub fn drain(&mut self) -> Vec<(K, Entry<V>)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }
}
