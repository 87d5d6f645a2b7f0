use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-project write locks. Writers to the same project queue up; writers to
/// different projects never wait on each other.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, project_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map have no holder or waiter.
            locks.retain(|id, lock| *id == project_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(project_id).or_default())
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
