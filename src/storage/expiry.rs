//! Background Expiry Sweeper
//!
//! Reads never delete anything: an expired entry is merely invisible until
//! a sweeper removes it. Each shard gets its own sweeper task, so a slow or
//! failing sweep of one shard never delays another.
//!
//! ## Design
//!
//! Every sweeper is a Tokio task that:
//! 1. Sleeps for the configured interval (or stops on cancellation)
//! 2. Removes all expired entries from its shard under the write lock
//! 3. Releases the lock, then for each removed entry decrements the cache's
//!    approximate counter and calls the eviction callback
//!
//! A panicking eviction callback is caught and logged. The remaining
//! entries of the sweep are still reported and the sweeper keeps running.

use crate::config::EvictionCallback;
use crate::storage::engine::Counters;
use crate::storage::Shard;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// The periodic maintenance task of a single shard.
pub(crate) struct Sweeper<V> {
    /// Position of the shard in the cache, for logging
    index: usize,
    shard: Arc<Shard<V>>,
    counters: Arc<Counters>,
    on_evict: Option<EvictionCallback<V>>,
    interval: Duration,
}

impl<V> Sweeper<V>
where
    V: Send + Sync + 'static,
{
    pub(crate) fn new(
        index: usize,
        shard: Arc<Shard<V>>,
        counters: Arc<Counters>,
        on_evict: Option<EvictionCallback<V>>,
        interval: Duration,
    ) -> Self {
        Self {
            index,
            shard,
            counters,
            on_evict,
            interval,
        }
    }

    /// Spawns the sweeper loop on `runtime`. It runs until `token` is
    /// cancelled.
    pub(crate) fn spawn(self, runtime: &Handle, token: CancellationToken) -> JoinHandle<()> {
        runtime.spawn(self.run(token))
    }

    async fn run(self, token: CancellationToken) {
        debug!(shard = self.index, interval_ms = self.interval.as_millis(), "Sweeper started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(shard = self.index, "Sweeper received shutdown signal");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            self.sweep_once();
        }
    }

    /// Runs one sweep of the shard and reports what it removed.
    ///
    /// Returns the number of entries reclaimed.
    pub(crate) fn sweep_once(&self) -> usize {
        // The shard lock is released when sweep_expired returns.
        let removed = self.shard.sweep_expired();
        let reclaimed = removed.len();

        if reclaimed == 0 {
            trace!(shard = self.index, "Nothing to sweep");
            return 0;
        }

        for (key, value) in removed {
            self.counters.entry_removed();
            self.counters.entry_expired();

            if let Some(on_evict) = &self.on_evict {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| on_evict(key, value)));
                if outcome.is_err() {
                    self.counters.callback_panicked();
                    error!(shard = self.index, "Eviction callback panicked");
                }
            }
        }

        debug!(
            shard = self.index,
            expired = reclaimed,
            keys_remaining = self.shard.len(),
            "Expired keys cleaned up"
        );

        reclaimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SHORT_TTL: Duration = Duration::from_millis(20);

    fn sweeper_with(
        shard: &Arc<Shard<u32>>,
        counters: &Arc<Counters>,
        on_evict: Option<EvictionCallback<u32>>,
    ) -> Sweeper<u32> {
        Sweeper::new(
            0,
            Arc::clone(shard),
            Arc::clone(counters),
            on_evict,
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_sweep_once_reports_each_entry() {
        let shard = Arc::new(Shard::new());
        let counters = Arc::new(Counters::default());
        let evicted = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            shard.set(format!("key{}", i), i, SHORT_TTL);
            counters.entry_added();
        }
        shard.set("persistent".into(), 99, Duration::ZERO);
        counters.entry_added();

        let sink = Arc::clone(&evicted);
        let callback: EvictionCallback<u32> =
            Arc::new(move |key, value| sink.lock().unwrap().push((key, value)));
        let sweeper = sweeper_with(&shard, &counters, Some(callback));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(sweeper.sweep_once(), 3);

        let mut evicted = evicted.lock().unwrap().clone();
        evicted.sort();
        assert_eq!(
            evicted,
            vec![
                ("key0".to_string(), 0),
                ("key1".to_string(), 1),
                ("key2".to_string(), 2)
            ]
        );
        assert_eq!(counters.approximate(), 1);
        assert_eq!(counters.expired(), 3);

        // A second sweep finds nothing.
        assert_eq!(sweeper.sweep_once(), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_stop_sweep() {
        let shard = Arc::new(Shard::new());
        let counters = Arc::new(Counters::default());
        let calls = Arc::new(AtomicUsize::new(0));

        for i in 0..5 {
            shard.set(format!("key{}", i), i, SHORT_TTL);
            counters.entry_added();
        }

        let seen = Arc::clone(&calls);
        let callback: EvictionCallback<u32> = Arc::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            panic!("callback failure");
        });
        let sweeper = sweeper_with(&shard, &counters, Some(callback));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(sweeper.sweep_once(), 5);

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(counters.callback_panics(), 5);
        assert_eq!(counters.approximate(), 0);
        assert!(shard.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let shard = Arc::new(Shard::new());
        let counters = Arc::new(Counters::default());
        let token = CancellationToken::new();

        let handle = sweeper_with(&shard, &counters, None).spawn(&Handle::current(), token.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop after cancellation")
            .unwrap();

        // With the sweeper gone, expired entries stay in the shard.
        shard.set("key".into(), 1, Duration::from_millis(10));
        counters.entry_added();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(shard.get("key"), None);
        assert_eq!(shard.len(), 1);
        assert_eq!(counters.approximate(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let shard = Arc::new(Shard::new());
        let counters = Arc::new(Counters::default());
        let token = CancellationToken::new();

        for i in 0..10 {
            shard.set(format!("key{}", i), i, SHORT_TTL);
            counters.entry_added();
        }
        shard.set("persistent".into(), 100, Duration::ZERO);
        counters.entry_added();

        let _handle = sweeper_with(&shard, &counters, None).spawn(&Handle::current(), token.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(shard.len(), 1);
        assert_eq!(counters.approximate(), 1);
        assert!(shard.contains_key("persistent"));

        token.cancel();
    }
}
