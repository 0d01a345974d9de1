//! Per-session serialization.
//!
//! A turn holds its session's mutex from planning to commit, so two requests
//! against the same session never interleave. Requests for different
//! sessions never share a lock. Registry entries are pruned once the last
//! holder or waiter is gone.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-session mutexes keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: Uuid) -> SessionLockGuard {
        let mutex = {
            let entry = self
                .inner
                .entry(session_id)
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        // The map shard is released above; only the session mutex is awaited.
        let guard = mutex.lock_owned().await;
        SessionLockGuard {
            guard: Some(guard),
            session_id,
            locks: Arc::clone(&self.inner),
        }
    }

    /// Number of sessions with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Exclusive access to one session. Released on drop.
#[derive(Debug)]
pub struct SessionLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    session_id: Uuid,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLockGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the Arc, so the entry survives while anyone queues on it.
        self.locks
            .remove_if(&self.session_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
