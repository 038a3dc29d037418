//! MetadataContainer - append-only metadata store attached to one build
//!
//! Producers call [`MetadataContainer::of`] with the build they are working on
//! and `add` values; consumers read a [`MetadataView`] or the serialized form.

mod attach;
mod view;

pub use self::view::MetadataView;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace, warn};

use self::view::Groups;
use crate::domain::SerializationError;
use crate::typed::{DynMetadataValue, MetadataCodec, MetadataEntry, MetadataValue, TypeRegistry};

/// Append-only, multi-valued metadata store keyed by `MetadataValue::key()`.
///
/// Design:
/// - Values under one key keep insertion order; duplicates accumulate.
/// - The only removal is `remove_all(key)`.
/// - All methods take `&self`. The multimap sits behind a `RwLock`, so
///   independent writers can append to the same container concurrently.
/// - Storage is an `Arc` that is copied on write while a `MetadataView` still
///   holds it, so handing out views never copies and never leaks mutability.
/// - The codec is created lazily on first use. A container restored from its
///   persisted form starts without one and rebuilds it the same way.
pub struct MetadataContainer {
    groups: RwLock<Arc<Groups>>,
    codec: OnceLock<MetadataCodec>,
}

impl MetadataContainer {
    /// Container that decodes through [`TypeRegistry::global`].
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(Arc::new(Groups::new())),
            codec: OnceLock::new(),
        }
    }

    /// Container that decodes through `registry` instead of the global one.
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            groups: RwLock::new(Arc::new(Groups::new())),
            codec: OnceLock::from(MetadataCodec::new(registry)),
        }
    }

    fn codec(&self) -> &MetadataCodec {
        self.codec.get_or_init(MetadataCodec::global)
    }

    /// Append one value under its key.
    pub fn add(&self, value: impl Into<MetadataEntry>) -> &Self {
        let entry = value.into();
        trace!(key = entry.key(), type_tag = entry.type_tag(), "adding metadata");

        let mut groups = self.groups.write();
        push(Arc::make_mut(&mut *groups), entry);
        self
    }

    /// Append every value in iteration order.
    ///
    /// All values become visible at once: readers see either none or all of them.
    pub fn add_all<I>(&self, values: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<MetadataEntry>,
    {
        let entries: Vec<MetadataEntry> = values.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return self;
        }
        trace!(count = entries.len(), "adding metadata batch");

        let mut groups = self.groups.write();
        let groups = Arc::make_mut(&mut *groups);
        for entry in entries {
            push(groups, entry);
        }
        self
    }

    /// Drop every value under `key`. Absent keys are ignored.
    pub fn remove_all(&self, key: &str) {
        let mut groups = self.groups.write();
        if !groups.contains_key(key) {
            return;
        }
        let removed = Arc::make_mut(&mut *groups).remove(key).map_or(0, |group| group.len());
        debug!(key, removed, "removed metadata group");
    }

    pub fn metadata(&self) -> MetadataView {
        let groups = self.groups.read();
        MetadataView::new(Arc::clone(&*groups))
    }

    /// One JSON string per distinct key, each the `list_serialize` of that key's group.
    pub fn serialized_metadata(&self) -> Result<BTreeMap<String, String>, SerializationError> {
        let view = self.metadata();
        let mut serialized = BTreeMap::new();
        for (key, entries) in view.groups() {
            serialized.insert(key.to_string(), self.list_serialize(entries)?);
        }
        Ok(serialized)
    }

    /// Encode one value as a one-element list.
    pub fn serialize(&self, value: &dyn DynMetadataValue) -> Result<String, SerializationError> {
        self.codec().encode_list([value])
    }

    /// Encode values of any registered types, tagging each element.
    pub fn list_serialize<I>(&self, values: I) -> Result<String, SerializationError>
    where
        I: IntoIterator,
        I::Item: Into<MetadataEntry>,
    {
        let entries: Vec<MetadataEntry> = values.into_iter().map(Into::into).collect();
        self.codec().encode_list(entries.iter().map(MetadataEntry::as_dyn))
    }

    /// Decode exactly one value of type `T`.
    pub fn deserialize<T: MetadataValue>(&self, serialized: &str) -> Result<T, SerializationError> {
        self.codec().decode_one(serialized)
    }

    /// Decode a list whose elements are all of type `T`.
    pub fn list_deserialize<T: MetadataValue>(
        &self,
        serialized: &str,
    ) -> Result<Vec<T>, SerializationError> {
        self.codec().decode_list(serialized)
    }

    /// Decode exactly one value of whatever registered type it was written as.
    pub fn deserialize_entry(&self, serialized: &str) -> Result<MetadataEntry, SerializationError> {
        self.codec().decode_one_entry(serialized)
    }

    /// Decode a heterogeneous list through the type registry.
    pub fn list_deserialize_entries(
        &self,
        serialized: &str,
    ) -> Result<Vec<MetadataEntry>, SerializationError> {
        self.codec().decode_entries(serialized)
    }
}

fn push(groups: &mut Groups, entry: MetadataEntry) {
    groups.entry(entry.key().to_string()).or_default().push(entry);
}

impl Default for MetadataContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetadataContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataContainer")
            .field("metadata", &self.metadata())
            .finish()
    }
}

#[derive(Serialize)]
struct PersistedRef<'a> {
    metadata: BTreeMap<&'a str, Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct Persisted {
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

/// Persisted as `{"metadata": {"<key>": [<wrapper>, ...]}}`.
impl Serialize for MetadataContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view = self.metadata();
        let mut metadata = BTreeMap::new();
        for (key, entries) in view.groups() {
            let wrappers = entries
                .iter()
                .map(|entry| MetadataCodec::wrap(entry.as_dyn()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(S::Error::custom)?;
            metadata.insert(key, wrappers);
        }
        PersistedRef { metadata }.serialize(serializer)
    }
}

/// Entries are decoded through the global registry and regrouped by the
/// key of the decoded value.
impl<'de> Deserialize<'de> for MetadataContainer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let persisted = Persisted::deserialize(deserializer)?;
        let container = MetadataContainer::new();
        for (key, group) in persisted.metadata {
            let entries = container
                .codec()
                .decode_entries_value(group)
                .map_err(|err| {
                    warn!(key = %key, error = %err, "failed to restore persisted metadata group");
                    D::Error::custom(err)
                })?;
            container.add_all(entries);
        }
        Ok(container)
    }
}
