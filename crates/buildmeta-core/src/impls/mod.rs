//! Impls - port implementations
//!
//! # Included
//! - **InMemoryBuildHost**: in-process build host for embedding and tests

pub mod inmem_host;

pub use self::inmem_host::InMemoryBuildHost;
