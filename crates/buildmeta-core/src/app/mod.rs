//! App - startup wiring
//!
//! - **builder**: `RegistryBuilder`, fail-fast registration of metadata types

pub mod builder;

pub use self::builder::{BuildError, RegistryBuilder};
