//! Ports - interfaces to the hosting CI system
//!
//! - **BuildHost**: locate and attach the per-build metadata container

pub mod build_host;

pub use self::build_host::BuildHost;
