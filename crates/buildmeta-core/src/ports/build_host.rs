//! BuildHost port - the CI host that owns build records
//!
//! This crate does not know how a host locates, persists or renders a build.
//! It only reads and writes the one metadata container attached to it.

use std::sync::Arc;

use crate::container::MetadataContainer;
use crate::domain::BuildId;

/// BuildHost stores one attached container per build.
///
/// # Contract
/// - `attached_container` returns the container last attached to `build`, if any
/// - `attach_container` attaches `container`, replacing any previous one
///
/// Implementations do not need their own check-then-attach locking;
/// [`MetadataContainer::of`] serializes that per build.
pub trait BuildHost: Send + Sync {
    fn attached_container(&self, build: &BuildId) -> Option<Arc<MetadataContainer>>;

    fn attach_container(&self, build: &BuildId, container: Arc<MetadataContainer>);
}
