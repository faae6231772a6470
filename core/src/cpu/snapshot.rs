//! Last-seen tick reading per tracked key.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ticks::{CpuKey, Ticks};

/// Holds the most recent [`Ticks`] per [`CpuKey`] for one provider instance.
///
/// Each provider (local machine, each remote host) owns its own store so
/// interleaved sampling of several targets never mixes baselines. Every
/// operation is a single critical section; [`replace`](Self::replace) is the
/// read-modify-write the rate calculator relies on.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: Mutex<HashMap<CpuKey, Ticks>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored baseline for `key`, if any.
    pub fn get(&self, key: &CpuKey) -> Option<Ticks> {
        self.lock().get(key).copied()
    }

    /// Store `ticks` as the baseline for `key`, discarding any prior value.
    pub fn put(&self, key: CpuKey, ticks: Ticks) {
        self.lock().insert(key, ticks);
    }

    /// Store `ticks` and return the baseline it replaced, atomically.
    ///
    /// Two concurrent calls for the same key are serialized: the second
    /// observes the tuple written by the first.
    pub fn replace(&self, key: CpuKey, ticks: Ticks) -> Option<Ticks> {
        self.lock().insert(key, ticks)
    }

    /// Drop the baseline for `key`. Returns the removed value.
    pub fn remove(&self, key: &CpuKey) -> Option<Ticks> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Tracked keys in sorted order.
    pub fn keys(&self) -> Vec<CpuKey> {
        let mut keys: Vec<CpuKey> = self.lock().keys().copied().collect();
        keys.sort();
        keys
    }

    // The map only holds plain `Copy` data, so a panic elsewhere while the
    // lock was held cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<CpuKey, Ticks>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
