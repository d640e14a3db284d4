//! Shards and Entries
//!
//! A [`Shard`] is one independently locked slice of the keyspace. Every
//! entry-level operation of the cache is implemented here; the cache itself
//! only routes keys and keeps counters.
//!
//! ## Locking
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Shard                     │
//! │  RwLock<HashMap<String, Entry<V>>>           │
//! │                                              │
//! │  read lock   get, contains_key, ttl,         │
//! │              for_each, count_live, len       │
//! │  write lock  set*, transform, remove,        │
//! │              sweep_expired                   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Expiry
//!
//! Expired entries are invisible to readers but stay in the map until the
//! sweeper reclaims them or a later write overwrites them. No read path
//! deletes anything, and `remove` leaves an expired entry for the sweeper
//! as well.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// A stored value with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The actual value stored
    pub value: V,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// Creates an entry written at `now`.
    ///
    /// A zero TTL means the entry never expires. So does a TTL too large to
    /// be represented as an `Instant`.
    pub fn new(value: V, ttl: Duration, now: Instant) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };

        Self { value, expires_at }
    }

    /// Whether this entry is expired at `now`.
    ///
    /// This is the only liveness check in the crate. An entry whose expiry
    /// instant equals `now` is expired.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Remaining time to live at `now`, or `None` if the entry never expires.
    pub fn ttl_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|exp| exp.saturating_duration_since(now))
    }
}

/// The result of a write against a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The key had no slot in the shard; a new one was created.
    Inserted,
    /// An existing slot (live or expired) was overwritten.
    Replaced,
    /// The write's precondition did not hold; nothing changed.
    Rejected,
}

impl WriteOutcome {
    /// Whether the value was written.
    #[inline]
    pub fn is_written(self) -> bool {
        !matches!(self, WriteOutcome::Rejected)
    }
}

/// An independently locked partition of the keyspace.
#[derive(Debug)]
pub struct Shard<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> Default for Shard<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Shard<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // A panic while a guard is held can only come from user code that runs
    // before the map is touched, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unconditionally writes `value` under `key`.
    ///
    /// Returns [`WriteOutcome::Inserted`] only if the key had no slot at
    /// all; overwriting an expired entry that has not been swept yet counts
    /// as [`WriteOutcome::Replaced`].
    pub fn set(&self, key: String, value: V, ttl: Duration) -> WriteOutcome {
        let now = Instant::now();
        let mut entries = self.write();

        match entries.insert(key, Entry::new(value, ttl, now)) {
            Some(_) => WriteOutcome::Replaced,
            None => WriteOutcome::Inserted,
        }
    }

    /// Writes `value` only if the key is absent or its entry has expired.
    pub fn set_if_absent(&self, key: String, value: V, ttl: Duration) -> WriteOutcome {
        let now = Instant::now();
        let mut entries = self.write();

        let outcome = match entries.get(&key) {
            Some(entry) if !entry.is_expired_at(now) => return WriteOutcome::Rejected,
            Some(_) => WriteOutcome::Replaced,
            None => WriteOutcome::Inserted,
        };

        entries.insert(key, Entry::new(value, ttl, now));
        outcome
    }

    /// Overwrites value and expiry only if a live entry exists.
    pub fn set_if_present(&self, key: &str, value: V, ttl: Duration) -> bool {
        self.get_and_set_if_present(key, value, ttl).is_some()
    }

    /// Like [`set_if_present`](Self::set_if_present), but hands back the
    /// value that was replaced.
    pub fn get_and_set_if_present(&self, key: &str, value: V, ttl: Duration) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.write();

        let entry = entries.get_mut(key).filter(|e| !e.is_expired_at(now))?;
        let old = std::mem::replace(entry, Entry::new(value, ttl, now));
        Some(old.value)
    }

    /// Replaces a live entry's value with `f(&old)`, keeping its expiry.
    ///
    /// `f` runs under the write lock. It must not call back into the cache.
    /// If `f` panics the entry keeps its old value.
    pub fn transform<F>(&self, key: &str, f: F) -> bool
    where
        F: FnOnce(&V) -> V,
    {
        let now = Instant::now();
        let mut entries = self.write();

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.value = f(&entry.value);
                true
            }
            _ => false,
        }
    }

    /// Removes and returns a live entry.
    ///
    /// An expired entry is reported as missing and left in place for the
    /// sweeper, which reclaims it and reports it to the eviction callback.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.write();

        if entries.get(key)?.is_expired_at(now) {
            return None;
        }

        entries.remove(key).map(|entry| entry.value)
    }

    /// Calls `f` for every live entry while holding the read lock.
    ///
    /// Writers to this shard are blocked until the scan finishes, and `f`
    /// must not call into this shard.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V),
    {
        let now = Instant::now();
        let entries = self.read();

        for (key, entry) in entries.iter() {
            if !entry.is_expired_at(now) {
                f(key, &entry.value);
            }
        }
    }

    /// Removes every expired entry and returns them.
    ///
    /// This is the only path that frees memory held by expired entries.
    pub fn sweep_expired(&self) -> Vec<(String, V)> {
        let now = Instant::now();
        let mut entries = self.write();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| entries.remove_entry(&key))
            .map(|(key, entry)| (key, entry.value))
            .collect()
    }

    /// Exact number of live entries. O(shard size).
    pub fn count_live(&self) -> usize {
        let now = Instant::now();
        self.read()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    /// Number of slots in the map, expired-but-unswept entries included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if a key exists and is not expired.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Remaining time to live of a live entry.
    ///
    /// # Returns
    ///
    /// - `None` if the key is missing or expired
    /// - `Some(None)` if the entry never expires
    /// - `Some(Some(remaining))` otherwise
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.ttl_at(now))
    }
}

impl<V: Clone> Shard<V> {
    /// Returns a copy of a live entry's value.
    ///
    /// Expired entries read as missing but are not deleted here.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
    }
}
