//! Typed - metadata value contract, type registry and JSON codec
//!
//! # Two layers
//! - **Typed**: `MetadataValue` trait (`const TYPE`, serde bounds)
//! - **Dyn**: `DynMetadataValue` / `MetadataEntry`, object-safe and type-erased
//!
//! `TypeRegistry` maps a type tag back to a decoder, which is what lets a
//! heterogeneous list survive a JSON round trip.
//!
//! # Encoding
//! Values are checked for non-finite floats before they are turned into JSON.

pub mod codec;
mod finite;
pub mod registry;
pub mod value;

pub use self::codec::MetadataCodec;
pub use self::registry::{RegistryError, TypeRegistry};
pub use self::value::{DynMetadataValue, MetadataEntry, MetadataValue};
