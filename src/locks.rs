// src/locks.rs
// Per-resource cross-process locking capability

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;

use crate::error::StoreError;

/// Cross-process lock service.
///
/// Production deployments back this with a hierarchical-node consensus
/// store; the contract is only `try_acquire`/`release` with cross-process
/// semantics.
pub trait LockStore: Send + Sync {
    /// Attempts to acquire the lock at `path`, waiting up to `timeout`.
    fn try_acquire(&self, path: &str, timeout: Duration) -> bool;

    /// Releases the lock at `path`.
    fn release(&self, path: &str);
}

/// In-process lock table. Suitable for a single-process deployment and for
/// tests; not cross-process.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    held: DashMap<String, ()>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for MemoryLockStore {
    fn try_acquire(&self, path: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.held.entry(path.to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(());
                    return true;
                }
                Entry::Occupied(_) => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn release(&self, path: &str) {
        if self.held.remove(path).is_none() {
            warn!(path, "released a lock that was not held");
        }
    }
}

/// Scoped lock: releases on drop, on every exit path including panics.
pub struct LockGuard<'a> {
    store: &'a dyn LockStore,
    path: String,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.store.release(&self.path);
    }
}

/// Acquires the per-resource lock or fails with `LockTimeout`. No internal
/// retry beyond the bounded wait.
pub fn acquire<'a>(
    store: &'a dyn LockStore,
    path: &str,
    timeout: Duration,
) -> Result<LockGuard<'a>, StoreError> {
    if store.try_acquire(path, timeout) {
        Ok(LockGuard {
            store,
            path: path.to_string(),
        })
    } else {
        Err(StoreError::LockTimeout(path.to_string()))
    }
}
