//! buildmeta-core
//!
//! Append-only, typed metadata store attached to CI build records.
//!
//! Plugins contribute values of their own types under a string key; consumers
//! read them back grouped by key, or as JSON that keeps every value's concrete
//! type.
//!
//! # Modules
//! - **domain**: build identity, `SerializationError`
//! - **typed**: `MetadataValue` contract, `TypeRegistry`, `MetadataCodec`
//! - **container**: `MetadataContainer` and its read-only `MetadataView`
//! - **ports**: `BuildHost`, the CI host seam
//! - **impls**: `InMemoryBuildHost`
//! - **app**: `RegistryBuilder` for startup wiring
//!
//! # Example
//! ```
//! use buildmeta_core::{BuildId, InMemoryBuildHost, MetadataContainer, MetadataValue, TypeRegistry};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Label {
//!     name: String,
//! }
//!
//! impl MetadataValue for Label {
//!     const TYPE: &'static str = "example.label.v1";
//!
//!     fn key(&self) -> &str {
//!         "label"
//!     }
//! }
//!
//! TypeRegistry::global().register::<Label>().unwrap();
//!
//! let host = InMemoryBuildHost::new();
//! let build = BuildId::new("main#7");
//! let container = MetadataContainer::of(&host, &build);
//! container.add(Label { name: "release".into() });
//!
//! let serialized = container.serialized_metadata().unwrap();
//! assert_eq!(serialized["label"], r#"[{"example.label.v1":{"name":"release"}}]"#);
//!
//! let label: Label = container.deserialize(&serialized["label"]).unwrap();
//! assert_eq!(label.name, "release");
//! ```

pub mod app;
pub mod container;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
mod testing;

pub use app::{BuildError, RegistryBuilder};
pub use container::{MetadataContainer, MetadataView};
pub use domain::{BuildId, SerializationError};
pub use impls::InMemoryBuildHost;
pub use ports::BuildHost;
pub use typed::{
    DynMetadataValue, MetadataCodec, MetadataEntry, MetadataValue, RegistryError, TypeRegistry,
};
