//! Cache Configuration
//!
//! [`CacheConfig`] is a plain value built with `with_*` methods and checked
//! once by [`CacheConfig::validate`] before any shard or sweeper exists.
//!
//! ```
//! use flashcache::CacheConfig;
//! use std::time::Duration;
//!
//! let config = CacheConfig::<String>::default()
//!     .with_shards(16)
//!     .with_sweep_interval(Duration::from_millis(100))
//!     .with_on_evict(|key, value| println!("{} expired ({})", key, value));
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::storage::{Fnv1a, KeyHasher};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 64;

/// Default interval between two sweeps of the same shard.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(300);

/// Called once for every entry the sweeper reclaims after it expired.
pub type EvictionCallback<V> = Arc<dyn Fn(String, V) + Send + Sync>;

/// Errors reported by [`CacheConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The cache needs at least one shard.
    #[error("invalid config: shard count must be at least 1")]
    ZeroShards,

    /// A zero interval would make every sweeper spin.
    #[error("invalid config: sweep interval must be greater than zero")]
    ZeroSweepInterval,
}

/// Configuration for a [`Cache`](crate::Cache).
pub struct CacheConfig<V> {
    /// Number of independently locked shards
    pub(crate) shards: usize,

    /// How often each shard is swept for expired entries
    pub(crate) sweep_interval: Duration,

    /// Invoked for each entry removed by the sweeper
    pub(crate) on_evict: Option<EvictionCallback<V>>,

    /// Routes keys to shards
    pub(crate) hasher: Arc<dyn KeyHasher>,
}

impl<V> Default for CacheConfig<V> {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            on_evict: None,
            hasher: Arc::new(Fnv1a),
        }
    }
}

impl<V> Clone for CacheConfig<V> {
    fn clone(&self) -> Self {
        Self {
            shards: self.shards,
            sweep_interval: self.sweep_interval,
            on_evict: self.on_evict.clone(),
            hasher: Arc::clone(&self.hasher),
        }
    }
}

impl<V> fmt::Debug for CacheConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("shards", &self.shards)
            .field("sweep_interval", &self.sweep_interval)
            .field("on_evict", &self.on_evict.is_some())
            .finish_non_exhaustive()
    }
}

impl<V> CacheConfig<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of shards. Any positive count is accepted; keys are
    /// routed with `hash % shards`.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Sets how often each shard's sweeper runs.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the callback invoked for every entry reclaimed by a sweeper.
    ///
    /// The callback runs on the sweeper's task after the shard lock has been
    /// released, so it may call back into the cache. A panic inside it is
    /// caught and logged; the sweeper keeps running.
    pub fn with_on_evict<F>(mut self, f: F) -> Self
    where
        F: Fn(String, V) + Send + Sync + 'static,
    {
        self.on_evict = Some(Arc::new(f));
        self
    }

    /// Replaces the default FNV-1a key hasher.
    pub fn with_hasher<H>(mut self, hasher: H) -> Self
    where
        H: KeyHasher + 'static,
    {
        self.hasher = Arc::new(hasher);
        self
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Checks the configuration before a cache is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards < 1 {
            return Err(ConfigError::ZeroShards);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}
