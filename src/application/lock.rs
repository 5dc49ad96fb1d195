use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::AccountId;

#[derive(Debug)]
struct Entry {
    lock: Arc<RwLock<()>>,
    holders: usize,
}

/// One reader-writer lock per account, created on first use.
///
/// Entries are reference counted by the handles that point at them and are
/// removed once the last handle is dropped, so the registry only holds locks
/// that some thread currently owns or waits on. The registry mutex is held
/// only while a handle is created or dropped, never while the per-account
/// lock itself is held.
#[derive(Debug, Default)]
pub struct LockRegistry {
    entries: Mutex<HashMap<AccountId, Entry>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the lock for `key`. Every handle alive at the same time for
    /// the same key refers to the same lock.
    pub fn acquire(&self, key: AccountId) -> LockHandle<'_> {
        let mut entries = self.entries();
        let entry = entries.entry(key).or_insert_with(|| Entry {
            lock: Arc::new(RwLock::new(())),
            holders: 0,
        });
        entry.holders += 1;

        LockHandle {
            registry: self,
            key,
            lock: Arc::clone(&entry.lock),
        }
    }

    /// Number of accounts with at least one live handle.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn release(&self, key: AccountId) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(&key) {
            entry.holders -= 1;
            if entry.holders == 0 {
                entries.remove(&key);
            }
        }
    }

    // The map is only touched by insert/remove and a counter update, none of
    // which can leave it half-modified, so a poisoned mutex is still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<AccountId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claim on one account's lock. Dropping the handle releases the claim;
/// guards returned by [`read`](Self::read) and [`write`](Self::write) borrow
/// the handle and must be dropped first.
#[derive(Debug)]
pub struct LockHandle<'a> {
    registry: &'a LockRegistry,
    key: AccountId,
    lock: Arc<RwLock<()>>,
}

impl LockHandle<'_> {
    pub fn key(&self) -> AccountId {
        self.key
    }

    /// Shared access. Blocks while a writer holds the lock.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        // The lock guards no data, so poisoning carries nothing to recover.
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access. Blocks while any reader or writer holds the lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True if both handles refer to the same underlying lock.
    pub fn same_lock(&self, other: &LockHandle<'_>) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

impl Drop for LockHandle<'_> {
    fn drop(&mut self) {
        self.registry.release(self.key);
    }
}
