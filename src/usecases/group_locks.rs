//! One async mutex per group id. Transitions of the same group run one at a time;
//! different groups never wait on each other.
//!
//! Entries live only while someone holds or waits for them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct GroupLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Exclusive access to one group. Dropping it unlocks and prunes idle entries.
pub struct GroupGuard<'a> {
    owner: &'a GroupLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive access to `group_id`. Released when the guard drops.
    pub async fn lock(&self, group_id: &str) -> GroupGuard<'_> {
        let lock = Arc::clone(self.map().entry(group_id.to_string()).or_default());
        GroupGuard {
            owner: self,
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits. Also sweeps
        // entries left behind by cancelled waiters.
        self.owner
            .map()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
