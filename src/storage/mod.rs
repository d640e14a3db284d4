//! Storage Engine Module
//!
//! This module provides the core storage functionality for FlashCache:
//! a sharded key-value store with TTL support and one background expiry
//! sweeper per shard.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Cache                               │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │            │
//! │  └────▲────┘ └────▲────┘ └────▲────┘ └────▲────┘            │
//! └───────┼───────────┼───────────┼───────────┼─────────────────┘
//!         │           │           │           │
//!    ┌────┴───────────┴───────────┴───────────┴────┐
//!    │     Sweepers (one Tokio task per shard)      │
//!    └──────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: keys are routed by `hash % shards` to independent locks
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Keys can have time-to-live expiry
//! - **Lazy Expiry**: Expired keys are invisible on access
//! - **Active Expiry**: Sweepers reclaim expired keys and report them

pub mod engine;
pub(crate) mod expiry;
pub mod hasher;
pub mod shard;

// Re-export commonly used types
pub use engine::{Cache, CacheError, CacheStats};
pub use hasher::{Fnv1a, KeyHasher};
pub use shard::{Entry, Shard, WriteOutcome};
