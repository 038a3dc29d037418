//! MetadataValue trait - the contract every metadata value satisfies
//!
//! Two layers, the same way a typed handler sits on top of an erased one:
//! - **Typed**: `MetadataValue` (serde bounds + `const TYPE`), not object-safe
//! - **Dyn**: `DynMetadataValue`, object-safe, blanket-implemented for every `MetadataValue`
//!
//! The container stores `MetadataEntry`, a shared handle to `dyn DynMetadataValue`,
//! so values from unrelated plugins can live in one collection.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::finite::FiniteFloats;

/// MetadataValue ties a value type to its type tag.
///
/// # Example
/// ```
/// use buildmeta_core::MetadataValue;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Coverage {
///     line_rate: f64,
/// }
///
/// impl MetadataValue for Coverage {
///     const TYPE: &'static str = "acme.coverage.v1";
///
///     fn key(&self) -> &str {
///         "coverage"
///     }
/// }
/// ```
///
/// # Contract
/// - `TYPE` is unique among all registered types and never changes once values
///   have been persisted; `{namespace}.{name}.v{major}` keeps it that way.
/// - `key()` is not written as a field of its own. It must be recoverable from
///   the decoded value (a constant, or one of the serialized fields).
/// - The type serializes to a JSON object. Types without fields use `struct Foo {}`.
pub trait MetadataValue: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static {
    const TYPE: &'static str;

    /// Grouping key inside a container.
    fn key(&self) -> &str;
}

/// Object-safe view of a `MetadataValue`.
///
/// Method names differ from `MetadataValue` so that having both traits in
/// scope never makes a call ambiguous.
pub trait DynMetadataValue: fmt::Debug + Send + Sync {
    fn dyn_key(&self) -> &str;

    fn type_tag(&self) -> &'static str;

    /// Encode the value's fields (without the type wrapper).
    ///
    /// Fails on `NaN` and infinite floats, which have no JSON representation.
    fn encode_fields(&self) -> Result<serde_json::Value, serde_json::Error>;

    fn as_any(&self) -> &dyn Any;
}

impl<T: MetadataValue> DynMetadataValue for T {
    fn dyn_key(&self) -> &str {
        MetadataValue::key(self)
    }

    fn type_tag(&self) -> &'static str {
        T::TYPE
    }

    fn encode_fields(&self) -> Result<serde_json::Value, serde_json::Error> {
        Serialize::serialize(self, FiniteFloats)?;
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared handle to a metadata value of any registered type.
///
/// Cloning is cheap (one `Arc` increment); clones point at the same value.
#[derive(Clone)]
pub struct MetadataEntry(Arc<dyn DynMetadataValue>);

impl MetadataEntry {
    pub fn new<T: MetadataValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc(value: Arc<dyn DynMetadataValue>) -> Self {
        Self(value)
    }

    pub fn key(&self) -> &str {
        self.0.dyn_key()
    }

    pub fn type_tag(&self) -> &'static str {
        self.0.type_tag()
    }

    pub fn as_dyn(&self) -> &dyn DynMetadataValue {
        self.0.as_ref()
    }

    pub fn is<T: MetadataValue>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: MetadataValue>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl<T: MetadataValue> From<T> for MetadataEntry {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl From<&MetadataEntry> for MetadataEntry {
    fn from(entry: &MetadataEntry) -> Self {
        entry.clone()
    }
}

impl fmt::Debug for MetadataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Two entries are equal when they share a value, or when tag, key and encoded
/// fields all match. Values that fail to encode only equal themselves.
impl PartialEq for MetadataEntry {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.type_tag() != other.type_tag() || self.key() != other.key() {
            return false;
        }
        match (self.0.encode_fields(), other.0.encode_fields()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
