//! Attach - lookup-or-create of the container attached to a build
//!
//! The check-then-attach sequence must not interleave for one build, otherwise
//! two writers could each attach a fresh container and one would lose its
//! metadata. Builds are serialized individually so unrelated builds never wait
//! on each other.
//!
//! # Locking
//! - a process-wide table maps `BuildId` → `Weak<Mutex<()>>`
//! - `of` holds the build's mutex across the host lookup and attach
//! - idle entries are pruned on the next insertion

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::{MetadataContainer, MetadataView};
use crate::domain::BuildId;
use crate::ports::BuildHost;

static ATTACH_LOCKS: LazyLock<BuildLocks> = LazyLock::new(BuildLocks::default);

/// One mutex per build currently inside `of`.
///
/// The table only holds weak references; a build's entry dies with the last
/// caller holding its lock and is pruned on a later insertion.
#[derive(Default)]
struct BuildLocks {
    locks: Mutex<HashMap<BuildId, Weak<Mutex<()>>>>,
}

impl BuildLocks {
    fn lock_for(&self, build: &BuildId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(build).and_then(Weak::upgrade) {
            return lock;
        }
        locks.retain(|_, lock| lock.strong_count() > 0);

        let lock = Arc::new(Mutex::new(()));
        locks.insert(build.clone(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

impl MetadataContainer {
    /// The container attached to `build`, attaching a new one if there is none.
    ///
    /// Concurrent calls for the same build all observe the same container.
    pub fn of<H: BuildHost + ?Sized>(host: &H, build: &BuildId) -> Arc<MetadataContainer> {
        let lock = ATTACH_LOCKS.lock_for(build);
        let _guard = lock.lock();

        if let Some(container) = host.attached_container(build) {
            return container;
        }

        let container = Arc::new(MetadataContainer::new());
        host.attach_container(build, Arc::clone(&container));
        debug!(build = %build, "attached new metadata container");
        container
    }

    /// Shorthand for `MetadataContainer::of(host, build).metadata()`.
    pub fn metadata_of<H: BuildHost + ?Sized>(host: &H, build: &BuildId) -> MetadataView {
        Self::of(host, build).metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBuildHost;
    use crate::testing::TestMetadata;
    use crate::typed::MetadataEntry;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Host that widens the race window and counts attachments.
    #[derive(Default)]
    struct SlowHost {
        inner: InMemoryBuildHost,
        attaches: AtomicUsize,
    }

    impl BuildHost for SlowHost {
        fn attached_container(&self, build: &BuildId) -> Option<Arc<MetadataContainer>> {
            let found = self.inner.attached_container(build);
            std::thread::sleep(Duration::from_millis(5));
            found
        }

        fn attach_container(&self, build: &BuildId, container: Arc<MetadataContainer>) {
            self.attaches.fetch_add(1, Ordering::SeqCst);
            self.inner.attach_container(build, container);
        }
    }

    #[test]
    fn of_creates_when_not_present() {
        let host = InMemoryBuildHost::new();
        let build = BuildId::generate();
        assert!(host.attached_container(&build).is_none());
        assert!(host.is_empty());

        let container = MetadataContainer::of(&host, &build);

        assert_eq!(host.len(), 1);
        assert!(Arc::ptr_eq(&host.attached_container(&build).unwrap(), &container));
    }

    #[test]
    fn of_returns_the_attached_container() {
        let host = InMemoryBuildHost::new();
        let build = BuildId::generate();
        let existing = Arc::new(MetadataContainer::new());
        host.attach_container(&build, Arc::clone(&existing));

        assert!(Arc::ptr_eq(&MetadataContainer::of(&host, &build), &existing));
    }

    #[test]
    fn of_is_idempotent() {
        let host = InMemoryBuildHost::new();
        let build = BuildId::generate();

        let first = MetadataContainer::of(&host, &build);
        let second = MetadataContainer::of(&host, &build);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(host.len(), 1);
    }

    #[test]
    fn different_builds_get_different_containers() {
        let host = InMemoryBuildHost::new();

        let a = MetadataContainer::of(&host, &BuildId::generate());
        let b = MetadataContainer::of(&host, &BuildId::generate());

        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn metadata_of_reads_through_the_attached_container() {
        let host = InMemoryBuildHost::new();
        let build = BuildId::new("job#1");
        let data = TestMetadata::new("data", 1);
        MetadataContainer::of(&host, &build).add(data.clone());

        let metadata = MetadataContainer::metadata_of(&host, &build);
        assert_eq!(metadata.get("data"), &[MetadataEntry::new(data)]);
        assert_eq!(metadata.key_count(), 1);
    }

    #[test]
    fn works_through_a_trait_object() {
        let host: Box<dyn BuildHost> = Box::new(InMemoryBuildHost::new());
        let build = BuildId::generate();

        let first = MetadataContainer::of(host.as_ref(), &build);
        assert!(Arc::ptr_eq(&first, &MetadataContainer::of(host.as_ref(), &build)));
    }

    #[test]
    fn concurrent_of_attaches_exactly_once() {
        const CALLERS: usize = 8;

        let host = SlowHost::default();
        let build = BuildId::generate();
        let barrier = Barrier::new(CALLERS);

        let containers: Vec<Arc<MetadataContainer>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|i| {
                    let (host, build, barrier) = (&host, &build, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        let container = MetadataContainer::of(host, build);
                        container.add(TestMetadata::new("writer", i as i64));
                        container
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(host.attaches.load(Ordering::SeqCst), 1);
        assert!(containers.iter().all(|c| Arc::ptr_eq(c, &containers[0])));
        assert_eq!(containers[0].metadata().get("writer").len(), CALLERS);
    }

    #[test]
    fn idle_build_locks_are_pruned() {
        let locks = BuildLocks::default();
        let first = BuildId::generate();

        let held = locks.lock_for(&first);
        assert!(Arc::ptr_eq(&held, &locks.lock_for(&first)));
        drop(held);

        let _second = locks.lock_for(&BuildId::generate());
        assert_eq!(locks.tracked(), 1);
    }
}
