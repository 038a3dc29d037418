//! TypeRegistry - type tag → decoder mapping
//!
//! Decoding a wrapper `{ "<tag>": {...} }` needs to know which Rust type owns
//! `<tag>`. Types are registered explicitly; nothing is discovered at runtime.
//!
//! # Registration
//! - `register::<T: MetadataValue>()` stores a monomorphized decoder for `T`
//! - the same type may be registered any number of times (plugins load independently)
//! - a *different* type claiming a taken tag is rejected
//!
//! A process-wide instance is available through [`TypeRegistry::global`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::value::{MetadataEntry, MetadataValue};
use crate::domain::SerializationError;

type DecodeFn = fn(serde_json::Value) -> Result<MetadataEntry, serde_json::Error>;

#[derive(Clone, Copy)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

fn decode_as<T: MetadataValue>(fields: serde_json::Value) -> Result<MetadataEntry, serde_json::Error> {
    serde_json::from_value::<T>(fields).map(MetadataEntry::new)
}

static GLOBAL: LazyLock<Arc<TypeRegistry>> = LazyLock::new(|| Arc::new(TypeRegistry::new()));

/// TypeRegistry maps type tags to decoders.
///
/// Registration and lookup both take `&self`; the map sits behind a
/// reader-writer lock so plugins can register while other threads decode.
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Registration>>,
}

/// RegistryError is returned when a registration cannot be accepted.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Metadata type tag '{0}' is already registered to a different type")]
    AlreadyRegistered(String),

    #[error("Invalid metadata type tag '{0}': tags must be non-empty and contain no whitespace")]
    InvalidTypeTag(String),
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> Arc<TypeRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub fn register<T: MetadataValue>(&self) -> Result<(), RegistryError> {
        let registration = Registration {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode: decode_as::<T>,
        };
        self.insert(T::TYPE, registration)
    }

    fn insert(&self, tag: &str, registration: Registration) -> Result<(), RegistryError> {
        validate_tag(tag)?;
        let mut types = self.types.write();
        if let Some(existing) = types.get(tag) {
            if existing.type_id == registration.type_id {
                return Ok(());
            }
            return Err(RegistryError::AlreadyRegistered(tag.to_string()));
        }
        debug!(type_tag = tag, type_name = registration.type_name, "registered metadata type");
        types.insert(tag.to_string(), registration);
        Ok(())
    }

    /// Copy every registration of `other` into `self`.
    ///
    /// Nothing is inserted unless all of `other`'s tags are free or already
    /// bound to the same type.
    pub fn merge(&self, other: &TypeRegistry) -> Result<(), RegistryError> {
        let incoming: Vec<(String, Registration)> = other
            .types
            .read()
            .iter()
            .map(|(tag, registration)| (tag.clone(), *registration))
            .collect();

        let mut types = self.types.write();
        for (tag, registration) in &incoming {
            if let Some(existing) = types.get(tag)
                && existing.type_id != registration.type_id
            {
                return Err(RegistryError::AlreadyRegistered(tag.clone()));
            }
        }
        for (tag, registration) in incoming {
            if !types.contains_key(&tag) {
                debug!(type_tag = %tag, type_name = registration.type_name, "registered metadata type");
                types.insert(tag, registration);
            }
        }
        Ok(())
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.types.read().contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.types.read().keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Decode the fields of one wrapper using the decoder registered for `tag`.
    pub fn decode(
        &self,
        tag: &str,
        fields: serde_json::Value,
    ) -> Result<MetadataEntry, SerializationError> {
        // Copy the fn pointer out so the lock is not held while decoding.
        let decode = self
            .types
            .read()
            .get(tag)
            .map(|registration| registration.decode)
            .ok_or_else(|| SerializationError::UnknownTypeTag(tag.to_string()))?;

        decode(fields).map_err(|source| SerializationError::Decode {
            type_tag: tag.to_string(),
            source,
        })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self.types.read();
        let mut map = f.debug_map();
        for (tag, registration) in types.iter() {
            map.entry(tag, &registration.type_name);
        }
        map.finish()
    }
}

fn validate_tag(tag: &str) -> Result<(), RegistryError> {
    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidTypeTag(tag.to_string()));
    }
    Ok(())
}
