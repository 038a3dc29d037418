//! MetadataView - read-only snapshot of a container's metadata
//!
//! # Ordering
//! - keys ascending
//! - entries under one key in insertion order

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::typed::{MetadataEntry, MetadataValue};

/// Key → ordered group of entries. Groups are never left empty.
pub(crate) type Groups = BTreeMap<String, Vec<MetadataEntry>>;

/// MetadataView exposes a container's metadata without any way to mutate it.
///
/// Design:
/// - Shares storage with the container (`Arc`), so taking a view is O(1).
/// - The container copies on write while a view is alive, so the view keeps
///   showing the state at the time it was taken.
#[derive(Clone, Default, PartialEq)]
pub struct MetadataView {
    groups: Arc<Groups>,
}

impl MetadataView {
    pub(crate) fn new(groups: Arc<Groups>) -> Self {
        Self { groups }
    }

    /// All entries under `key`, in insertion order. Empty if the key is absent.
    pub fn get(&self, key: &str) -> &[MetadataEntry] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entries under `key` whose concrete type is `T`.
    pub fn get_as<T: MetadataValue>(&self, key: &str) -> Vec<&T> {
        self.get(key)
            .iter()
            .filter_map(MetadataEntry::downcast_ref::<T>)
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Distinct keys, ascending.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// `(key, group)` pairs, ascending by key.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[MetadataEntry])> {
        self.groups
            .iter()
            .map(|(key, entries)| (key.as_str(), entries.as_slice()))
    }

    /// Every `(key, entry)` pair: groups ascending by key, entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataEntry)> {
        self.groups().flat_map(|(key, entries)| entries.iter().map(move |entry| (key, entry)))
    }

    pub fn key_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of entries across all keys.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl fmt::Debug for MetadataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.groups.iter()).finish()
    }
}
