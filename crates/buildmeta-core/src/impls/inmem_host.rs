//! InMemoryBuildHost - in-process build host
//!
//! Keeps one attached container per build in a map. Useful when embedding the
//! store in a process that has no build model of its own, and in tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::MetadataContainer;
use crate::domain::BuildId;
use crate::ports::BuildHost;

/// InMemoryBuildHost keeps attached containers in memory.
///
/// # Implementation
/// - `HashMap<BuildId, Arc<MetadataContainer>>` behind a `RwLock`
/// - lookups take the read lock, attach/detach take the write lock
///
/// # Example
/// ```
/// use buildmeta_core::{BuildId, InMemoryBuildHost, MetadataContainer};
///
/// let host = InMemoryBuildHost::new();
/// let build = BuildId::new("nightly#12");
/// let container = MetadataContainer::of(&host, &build);
/// assert!(container.metadata().is_empty());
/// assert_eq!(host.builds(), vec![build]);
/// ```
#[derive(Default)]
pub struct InMemoryBuildHost {
    containers: RwLock<HashMap<BuildId, Arc<MetadataContainer>>>,
}

impl InMemoryBuildHost {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Builds that currently have a container attached, sorted.
    pub fn builds(&self) -> Vec<BuildId> {
        let mut builds: Vec<BuildId> = self.containers.read().keys().cloned().collect();
        builds.sort();
        builds
    }

    /// Forget a build, returning its container if one was attached.
    pub fn detach(&self, build: &BuildId) -> Option<Arc<MetadataContainer>> {
        self.containers.write().remove(build)
    }

    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }
}

impl BuildHost for InMemoryBuildHost {
    fn attached_container(&self, build: &BuildId) -> Option<Arc<MetadataContainer>> {
        self.containers.read().get(build).cloned()
    }

    fn attach_container(&self, build: &BuildId, container: Arc<MetadataContainer>) {
        self.containers.write().insert(build.clone(), container);
    }
}
