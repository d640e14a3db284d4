//! The Sharded Cache
//!
//! [`Cache`] is the single entry point. It owns a fixed array of shards,
//! routes every keyed operation to exactly one of them, keeps an
//! approximate entry counter and owns the per-shard sweepers.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Cache<V>                             │
//! │        hash(key) % shard_count picks exactly one shard      │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │            │
//! │  └────▲────┘ └────▲────┘ └────▲────┘ └────▲────┘            │
//! │       │           │           │           │                 │
//! │  ┌────┴────┐ ┌────┴────┐ ┌────┴────┐ ┌────┴────┐            │
//! │  │Sweeper 0│ │Sweeper 1│ │Sweeper 2│ │Sweeper N│            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations on the same key are linearizable in the order they take the
//! shard lock. Nothing is ordered across shards, and no operation ever
//! holds two shard locks at once.
//!
//! ## Counting
//!
//! [`Cache::approximate_count`] is O(1) and counts entries still held by the
//! shards: an entry that expired but has not been swept yet is still
//! counted. It catches up within one sweep interval.
//! [`Cache::exact_count`] walks every shard and only counts live entries,
//! but each shard is visited separately, so it is not a snapshot of the
//! whole cache at one instant. The same holds for [`Cache::for_each`].

use crate::config::{CacheConfig, ConfigError};
use crate::storage::expiry::Sweeper;
use crate::storage::{KeyHasher, Shard, WriteOutcome};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Errors returned when building a [`Cache`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sweepers are Tokio tasks, so the cache must be built inside a runtime.
    #[error("no Tokio runtime available to run the expiry sweepers")]
    NoRuntime,
}

/// Counters shared between the cache and its sweepers.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    /// Entries held by the shards, expired-but-unswept ones included.
    /// Signed because a sweeper may decrement before the writer increments.
    entries: AtomicI64,
    /// Entries reclaimed by sweepers
    expired: AtomicU64,
    /// Eviction callbacks that panicked
    callback_panics: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn entry_added(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn entry_removed(&self) {
        self.entries.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn entry_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn callback_panicked(&self) {
        self.callback_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn approximate(&self) -> usize {
        self.entries.load(Ordering::Relaxed).max(0) as usize
    }

    pub(crate) fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }

    pub(crate) fn callback_panics(&self) -> u64 {
        self.callback_panics.load(Ordering::Relaxed)
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of shards
    pub shards: usize,
    /// Same value as [`Cache::approximate_count`]
    pub approximate_count: usize,
    /// Entries reclaimed by the sweepers so far
    pub expired: u64,
    /// Eviction callbacks that panicked so far
    pub callback_panics: u64,
}

/// A sharded, concurrent key-value cache with per-entry TTL.
///
/// The cache is meant to be shared behind an `Arc`. All operations take
/// `&self` and block only on the lock of the one shard the key routes to.
///
/// # Example
///
/// ```
/// use flashcache::{Cache, CacheConfig};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), flashcache::CacheError> {
/// let token = CancellationToken::new();
/// let cache = Cache::new(CacheConfig::default(), token.clone())?;
///
/// cache.set("name", "Ariz".to_string());
/// assert_eq!(cache.get("name"), Some("Ariz".to_string()));
///
/// cache.set_with_ttl("session", "abc123".to_string(), Duration::from_secs(60));
/// assert!(cache.contains_key("session"));
///
/// token.cancel();
/// # Ok(())
/// # }
/// ```
pub struct Cache<V> {
    shards: Box<[Arc<Shard<V>>]>,
    hasher: Arc<dyn KeyHasher>,
    counters: Arc<Counters>,
    /// Child of the caller's token; cancelled when the cache is dropped
    sweepers: CancellationToken,
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.shards.len())
            .field("approximate_count", &self.counters.approximate())
            .field("expired", &self.counters.expired())
            .finish()
    }
}

impl<V> Drop for Cache<V> {
    fn drop(&mut self) {
        self.sweepers.cancel();
    }
}

impl<V> Cache<V>
where
    V: Send + Sync + 'static,
{
    /// Builds a cache and starts one sweeper per shard.
    ///
    /// The sweepers run until `token` is cancelled or the cache is dropped.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the configuration is invalid and
    /// [`CacheError::NoRuntime`] outside a Tokio runtime. Nothing is created
    /// in either case.
    pub fn new(config: CacheConfig<V>, token: CancellationToken) -> Result<Self, CacheError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let shards: Box<[Arc<Shard<V>>]> =
            (0..config.shards).map(|_| Arc::new(Shard::new())).collect();
        let counters = Arc::new(Counters::default());
        let sweepers = token.child_token();

        for (index, shard) in shards.iter().enumerate() {
            Sweeper::new(
                index,
                Arc::clone(shard),
                Arc::clone(&counters),
                config.on_evict.clone(),
                config.sweep_interval,
            )
            .spawn(&runtime, sweepers.clone());
        }

        info!(
            shards = config.shards,
            sweep_interval_ms = config.sweep_interval.as_millis(),
            "Cache initialized"
        );

        Ok(Self {
            shards,
            hasher: config.hasher,
            counters,
            sweepers,
        })
    }
}

impl<V> Cache<V> {
    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        (self.hasher.hash_key(key.as_bytes()) % self.shards.len() as u64) as usize
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    fn record(&self, outcome: WriteOutcome) -> bool {
        if outcome == WriteOutcome::Inserted {
            self.counters.entry_added();
        }
        outcome.is_written()
    }

    /// Sets a key-value pair that never expires, overwriting any previous
    /// value.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, Duration::ZERO);
    }

    /// Sets a key-value pair that expires `ttl` from now. A zero `ttl` means
    /// the entry never expires.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let outcome = self.shard(&key).set(key, value, ttl);
        self.record(outcome);
    }

    /// Sets the value only if the key is missing or expired.
    ///
    /// Returns `true` if the value was written.
    pub fn set_if_absent(&self, key: impl Into<String>, value: V) -> bool {
        self.set_if_absent_with_ttl(key, value, Duration::ZERO)
    }

    /// [`set_if_absent`](Self::set_if_absent) with a TTL.
    pub fn set_if_absent_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) -> bool {
        let key = key.into();
        let outcome = self.shard(&key).set_if_absent(key, value, ttl);
        self.record(outcome)
    }

    /// Overwrites the value only if the key holds a live entry. The new
    /// entry never expires.
    ///
    /// Returns `true` if the value was written.
    pub fn set_if_present(&self, key: &str, value: V) -> bool {
        self.set_if_present_with_ttl(key, value, Duration::ZERO)
    }

    /// [`set_if_present`](Self::set_if_present) with a TTL.
    pub fn set_if_present_with_ttl(&self, key: &str, value: V, ttl: Duration) -> bool {
        self.shard(key).set_if_present(key, value, ttl)
    }

    /// Overwrites a live entry and returns the value it replaced.
    pub fn get_and_set_if_present(&self, key: &str, value: V) -> Option<V> {
        self.get_and_set_if_present_with_ttl(key, value, Duration::ZERO)
    }

    /// [`get_and_set_if_present`](Self::get_and_set_if_present) with a TTL.
    pub fn get_and_set_if_present_with_ttl(&self, key: &str, value: V, ttl: Duration) -> Option<V> {
        self.shard(key).get_and_set_if_present(key, value, ttl)
    }

    /// Atomically replaces a live entry's value with `f(&old)`. The entry's
    /// expiry is left unchanged.
    ///
    /// `f` runs while the shard's write lock is held: it must be quick and
    /// must not call back into this cache, or it will deadlock. If `f`
    /// panics, the panic propagates to the caller and the entry keeps its
    /// old value.
    ///
    /// Returns `false` if the key is missing or expired.
    pub fn transform<F>(&self, key: &str, f: F) -> bool
    where
        F: FnOnce(&V) -> V,
    {
        self.shard(key).transform(key, f)
    }

    /// Removes a live entry.
    ///
    /// Returns `false` for missing keys and for expired entries, which are
    /// left for the sweeper.
    pub fn remove(&self, key: &str) -> bool {
        self.get_and_remove(key).is_some()
    }

    /// Removes a live entry and returns its value.
    pub fn get_and_remove(&self, key: &str) -> Option<V> {
        let removed = self.shard(key).remove(key);
        if removed.is_some() {
            self.counters.entry_removed();
        }
        removed
    }

    /// Checks if a key holds a live entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.shard(key).contains_key(key)
    }

    /// Remaining time to live of a key.
    ///
    /// Returns `None` if the key is missing or expired, `Some(None)` if it
    /// never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        self.shard(key).ttl(key)
    }

    /// Calls `f` for every live entry, one shard at a time.
    ///
    /// Each shard's read lock is held while its entries are visited, so `f`
    /// must be quick and must not write to the cache. Writes that land in
    /// other shards during the walk may or may not be seen.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V),
    {
        for shard in self.shards.iter() {
            shard.for_each(&mut f);
        }
    }

    /// Number of entries, counting expired entries not yet swept. O(1).
    pub fn approximate_count(&self) -> usize {
        self.counters.approximate()
    }

    /// Number of live entries, summed shard by shard. O(total entries).
    pub fn exact_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.count_live()).sum()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            shards: self.shards.len(),
            approximate_count: self.counters.approximate(),
            expired: self.counters.expired(),
            callback_panics: self.counters.callback_panics(),
        }
    }
}

impl<V: Clone> Cache<V> {
    /// Gets a copy of the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expiry is
    /// visible immediately, independent of the sweepers.
    pub fn get(&self, key: &str) -> Option<V> {
        self.shard(key).get(key)
    }
}
