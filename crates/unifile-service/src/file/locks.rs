//! Per-file locks ordering metadata cache fills against store mutations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use unifile_core::types::FileId;

/// One async mutex per file id, created on demand and dropped with its
/// last holder.
///
/// A cache miss reads the store and fills the cache under the lock; every
/// store mutation and its eviction run under it too. A reader can
/// therefore never cache a record older than the last eviction.
#[derive(Debug, Clone, Default)]
pub(super) struct FileLocks {
    locks: Arc<DashMap<FileId, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub(super) async fn lock(&self, file_id: FileId) -> FileLock {
        let mutex = self.locks.entry(file_id).or_default().clone();
        let guard = mutex.lock_owned().await;
        FileLock {
            guard: Some(guard),
            file_id,
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

#[derive(Debug)]
pub(super) struct FileLock {
    guard: Option<OwnedMutexGuard<()>>,
    file_id: FileId,
    locks: Arc<DashMap<FileId, Arc<Mutex<()>>>>,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.file_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_file_is_serialized() {
        let locks = FileLocks::default();
        let id = FileId::new();

        let first = locks.lock(id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _lock = locks.lock(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_files_do_not_wait() {
        let locks = FileLocks::default();
        let _held = locks.lock(FileId::new()).await;

        tokio::time::timeout(Duration::from_millis(100), locks.lock(FileId::new()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_entries_are_dropped_with_last_holder() {
        let locks = FileLocks::default();
        let id = FileId::new();

        let lock = locks.lock(id).await;
        assert_eq!(locks.len(), 1);
        drop(lock);
        assert_eq!(locks.len(), 0);
    }
}
