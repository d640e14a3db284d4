//! FlashCache - load demo
//!
//! Runs a concurrent write workload with TTLs against a `Cache<Bytes>` and
//! prints how the approximate and exact counts evolve while the sweepers
//! reclaim expired entries.

use anyhow::{bail, Context};
use bytes::Bytes;
use flashcache::{Cache, CacheConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Demo configuration
struct Config {
    /// Number of cache shards
    shards: usize,
    /// Sweep interval in milliseconds
    sweep_ms: u64,
    /// Number of keys to write
    keys: usize,
    /// TTL of every key in milliseconds
    ttl_ms: u64,
    /// Number of concurrent writer tasks
    writers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shards: flashcache::config::DEFAULT_SHARDS,
            sweep_ms: flashcache::config::DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
            keys: 100_000,
            ttl_ms: 2_000,
            writers: 8,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        let mut config = Config::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .with_context(|| format!("{} requires a value", name))
            };

            match arg.as_str() {
                "--shards" | "-s" => config.shards = parse(&value("--shards")?, "--shards")?,
                "--sweep-ms" => config.sweep_ms = parse(&value("--sweep-ms")?, "--sweep-ms")?,
                "--keys" | "-k" => config.keys = parse(&value("--keys")?, "--keys")?,
                "--ttl-ms" | "-t" => config.ttl_ms = parse(&value("--ttl-ms")?, "--ttl-ms")?,
                "--writers" | "-w" => config.writers = parse(&value("--writers")?, "--writers")?,
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("FlashCache version {}", flashcache::VERSION);
                    std::process::exit(0);
                }
                other => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        if config.writers == 0 {
            bail!("--writers must be at least 1");
        }

        Ok(config)
    }
}

fn parse<T>(raw: &str, name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("invalid value for {}: {}", name, raw))
}

fn print_help() {
    println!(
        r#"
FlashCache - Sharded In-Process Cache (load demo)

USAGE:
    flashcache [OPTIONS]

OPTIONS:
    -s, --shards <N>       Number of shards (default: 64)
        --sweep-ms <MS>    Sweep interval in milliseconds (default: 300)
    -k, --keys <N>         Number of keys to write (default: 100000)
    -t, --ttl-ms <MS>      TTL of every key in milliseconds (default: 2000)
    -w, --writers <N>      Concurrent writer tasks (default: 8)
    -v, --version          Print version information
        --help             Print this help message

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=flashcache=debug
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args()?;

    // Set up logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let shutdown = CancellationToken::new();
    let evicted = Arc::new(AtomicU64::new(0));

    let cache_config = CacheConfig::<Bytes>::new()
        .with_shards(config.shards)
        .with_sweep_interval(Duration::from_millis(config.sweep_ms))
        .with_on_evict({
            let evicted = Arc::clone(&evicted);
            move |_, _| {
                evicted.fetch_add(1, Ordering::Relaxed);
            }
        });

    let cache = Arc::new(Cache::new(cache_config, shutdown.clone())?);
    info!(
        keys = config.keys,
        writers = config.writers,
        ttl_ms = config.ttl_ms,
        "Starting write workload"
    );

    let started = Instant::now();
    write_workload(&cache, &config).await?;
    info!(
        elapsed_ms = started.elapsed().as_millis(),
        approximate = cache.approximate_count(),
        "Write workload finished"
    );

    tokio::select! {
        _ = report_until_drained(&cache, &evicted) => {}
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    shutdown.cancel();
    info!(stats = ?cache.stats(), "Demo finished");
    Ok(())
}

/// Writes `config.keys` keys from `config.writers` concurrent tasks.
async fn write_workload(cache: &Arc<Cache<Bytes>>, config: &Config) -> anyhow::Result<()> {
    let ttl = Duration::from_millis(config.ttl_ms);
    let value = Bytes::from_static(b"flashcache-demo-value");

    let tasks: Vec<_> = (0..config.writers)
        .map(|writer| {
            let cache = Arc::clone(cache);
            let value = value.clone();
            let (keys, writers) = (config.keys, config.writers);
            tokio::task::spawn_blocking(move || {
                for i in (writer..keys).step_by(writers) {
                    cache.set_with_ttl(format!("key:{}", i), value.clone(), ttl);
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.context("writer task failed")?;
    }
    Ok(())
}

/// Logs counts once per second until every entry has been reclaimed.
async fn report_until_drained(cache: &Cache<Bytes>, evicted: &AtomicU64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        ticker.tick().await;

        let approximate = cache.approximate_count();
        info!(
            approximate,
            exact = cache.exact_count(),
            evicted = evicted.load(Ordering::Relaxed),
            "Cache status"
        );

        if approximate == 0 {
            return;
        }
    }
}
