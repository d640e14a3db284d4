//! # FlashCache - A Sharded In-Process Cache with TTL
//!
//! FlashCache is an embedded key-value cache written in Rust. It is linked
//! directly into an application: there is no server and no network hop,
//! just a `Cache<V>` shared between threads and tasks.
//!
//! ## Features
//!
//! - **Sharded Storage**: Keys are spread over independent `RwLock`s, no global lock
//! - **TTL Support**: Every entry can carry its own time-to-live
//! - **Background Sweeping**: One Tokio task per shard reclaims expired entries
//! - **Eviction Callback**: Get notified of every entry a sweeper reclaims
//! - **Generic Values**: Any `Send + Sync` type can be stored
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashCache                                 │
//! │                                                                         │
//! │  caller ──> Cache::op(key) ──> KeyHasher ──> hash % shards              │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │                Shards                        │    │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │    │
//! │                     │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │    │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │    │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │    │
//! │                     └──────────────────────────────────────────────┘    │
//! │                                                   ▲                     │
//! │                                                   │                     │
//! │                     ┌─────────────────────────────┴────────────────┐    │
//! │                     │     Sweepers (one Tokio task per shard)      │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashcache::{Cache, CacheConfig};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flashcache::CacheError> {
//!     let shutdown = CancellationToken::new();
//!
//!     let config = CacheConfig::default()
//!         .with_shards(16)
//!         .with_sweep_interval(Duration::from_millis(100))
//!         .with_on_evict(|key, value: u64| println!("{} expired with {}", key, value));
//!
//!     let cache = Cache::new(config, shutdown.clone())?;
//!
//!     cache.set_with_ttl("visits", 1, Duration::from_secs(30));
//!     cache.transform("visits", |v| v + 1);
//!     assert_eq!(cache.get("visits"), Some(2));
//!
//!     // Stops every sweeper.
//!     shutdown.cancel();
//!     Ok(())
//! }
//! ```
//!
//! ## Design Highlights
//!
//! ### Lazy + Active Expiry
//!
//! 1. **Lazy**: An expired entry is treated as absent by every operation the
//!    moment its TTL elapses, whether or not it was swept
//! 2. **Active**: Sweepers physically remove expired entries and hand them to
//!    the eviction callback, after releasing the shard lock
//!
//! ### Counting
//!
//! `approximate_count` is O(1) but lags behind passive expiry by up to one
//! sweep interval. `exact_count` is exact per shard but walks every entry.
//!
//! ### Callback Failures
//!
//! A panic inside `transform`'s function propagates to the caller and
//! leaves the entry unchanged. A panic inside the eviction callback is
//! caught by the sweeper, logged, and counted in [`CacheStats`].

pub mod config;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{CacheConfig, ConfigError, EvictionCallback};
pub use storage::{Cache, CacheError, CacheStats, Fnv1a, KeyHasher};

/// Version of FlashCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
