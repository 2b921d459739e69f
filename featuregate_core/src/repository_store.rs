//! A thread-safe in-memory storage for the currently active toggle/segment snapshot.
//! [`RepositoryStore`] provides concurrent access for readers (toggle evaluation) and the single
//! writer (the background synchronizer).
use std::sync::{Arc, RwLock};

use crate::toggle::Repository;

/// `RepositoryStore` provides a thread-safe (`Sync`) storage for the toggle snapshot that allows
/// concurrent access for readers and writers.
///
/// `Repository` itself is always immutable and can only be replaced completely, so readers never
/// observe a mix of old and new definitions.
#[derive(Default)]
pub struct RepositoryStore {
    repository: RwLock<Option<Arc<Repository>>>,
}

impl RepositoryStore {
    /// Create a new empty repository store.
    pub fn new() -> Self {
        RepositoryStore::default()
    }

    /// Get the currently-active snapshot. Returns None if no snapshot has been published yet (or
    /// the store was cleared on shutdown).
    pub fn get_repository(&self) -> Option<Arc<Repository>> {
        // self.repository.read() should always return Ok(). Err() is possible only if the lock
        // is poisoned (writer panicked while holding the lock), which should never happen.
        let repository = self
            .repository
            .read()
            .expect("thread holding repository lock should not panic");

        repository.clone()
    }

    /// Publish a new snapshot, replacing the previous one wholesale.
    pub fn set_repository(&self, repository: Arc<Repository>) {
        let mut slot = self
            .repository
            .write()
            .expect("thread holding repository lock should not panic");

        *slot = Some(repository);
    }

    /// Drop the current snapshot. Later reads see an absent repository and evaluation serves
    /// caller defaults instead of stale data.
    pub fn clear(&self) {
        let mut slot = self
            .repository
            .write()
            .expect("thread holding repository lock should not panic");

        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::RepositoryStore;
    use crate::toggle::Repository;

    #[test]
    fn can_set_repository_from_another_thread() {
        let store = Arc::new(RepositoryStore::new());

        assert!(store.get_repository().is_none());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || {
                store.set_repository(Arc::new(Repository::default()));
            })
            .join();
        }

        assert!(store.get_repository().is_some());
    }

    #[test]
    fn clear_resets_to_absent() {
        let store = RepositoryStore::new();
        store.set_repository(Arc::new(Repository::default()));
        assert!(store.get_repository().is_some());

        store.clear();
        assert!(store.get_repository().is_none());
    }

    #[test]
    fn readers_keep_their_snapshot_across_replacement() {
        let store = RepositoryStore::new();

        let mut first = Repository::default();
        first.segments.insert(
            "old".to_owned(),
            crate::toggle::Segment {
                unique_id: "old".to_owned(),
                version: 1,
                rules: vec![],
            },
        );
        store.set_repository(Arc::new(first));

        let snapshot = store.get_repository().unwrap();
        store.set_repository(Arc::new(Repository::default()));

        // the old snapshot stays intact for readers that already hold it
        assert!(snapshot.segments.contains_key("old"));
        assert!(store.get_repository().unwrap().segments.is_empty());
    }
}
