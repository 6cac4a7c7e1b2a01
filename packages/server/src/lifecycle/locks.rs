use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// Per-record mutation locks.
///
/// Updates and deletes of the same record run one at a time within this
/// process. Entries are dropped as soon as nobody holds or waits on them.
#[derive(Clone, Default)]
pub struct MutationLocks {
    inner: Arc<LockMap>,
}

pub struct MutationGuard {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl MutationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: Uuid) -> MutationGuard {
        let lock = self.inner.entry(id).or_default().value().clone();
        let guard = lock.lock_owned().await;
        MutationGuard {
            id,
            guard: Some(guard),
            locks: Arc::clone(&self.inner),
        }
    }

    /// Number of records with a held or awaited lock.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        // Release before checking whether anyone else still needs the entry.
        self.guard.take();
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
