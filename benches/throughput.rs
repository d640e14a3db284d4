//! Throughput Benchmark for FlashCache
//!
//! This benchmark measures the performance of the sharded cache
//! under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flashcache::{Cache, CacheConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Builds a cache whose sweepers run on `runtime`.
fn new_cache(runtime: &Runtime, shards: usize) -> Arc<Cache<Bytes>> {
    let _guard = runtime.enter();
    let config = CacheConfig::new().with_shards(shards);
    Arc::new(Cache::new(config, CancellationToken::new()).expect("valid config"))
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cache = new_cache(&runtime, 64);

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            cache.set(format!("key:{}", i), Bytes::from_static(b"small_value"));
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            cache.set(format!("key:{}", i), value.clone());
            i += 1;
        });
    });

    group.bench_function("set_if_absent_existing", |b| {
        cache.set("present", Bytes::from_static(b"value"));
        b.iter(|| {
            black_box(cache.set_if_absent("present", Bytes::from_static(b"other")));
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cache = new_cache(&runtime, 64);

    // Pre-populate with data
    for i in 0..100_000 {
        cache.set(format!("key:{}", i), Bytes::from(format!("value:{}", i)));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(cache.get(&format!("key:{}", i % 100_000)));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(cache.get(&format!("missing:{}", i)));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cache = new_cache(&runtime, 64);

    // Pre-populate
    for i in 0..10_000 {
        cache.set(format!("key:{}", i), Bytes::from(format!("value:{}", i)));
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                cache.set(format!("new:{}", i), Bytes::from_static(b"value"));
            } else {
                // 80% reads
                black_box(cache.get(&format!("key:{}", i % 10_000)));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark TRANSFORM on counters
fn bench_transform(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let _guard = runtime.enter();
    let cache: Cache<u64> =
        Cache::new(CacheConfig::default(), CancellationToken::new()).expect("valid config");

    for i in 0..1000 {
        cache.set(format!("counter:{}", i), 0);
    }

    let mut group = c.benchmark_group("transform");
    group.throughput(Throughput::Elements(1));

    // Single counter (high contention on one shard)
    group.bench_function("single_counter", |b| {
        b.iter(|| {
            black_box(cache.transform("counter:0", |v| v + 1));
        });
    });

    // Multiple counters (spread over shards)
    group.bench_function("multiple_counters", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(cache.transform(&format!("counter:{}", i % 1000), |v| v + 1));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access with different shard counts
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    for shards in [1, 16, 64] {
        group.bench_function(format!("4_threads_mixed_{}_shards", shards), |b| {
            b.iter(|| {
                let cache = new_cache(&runtime, shards);
                let handles: Vec<_> = (0..4)
                    .map(|t| {
                        let cache = Arc::clone(&cache);
                        thread::spawn(move || {
                            for i in 0..10_000 {
                                let key = format!("key:{}:{}", t, i);
                                cache.set(key.clone(), Bytes::from_static(b"value"));
                                cache.get(&key);
                            }
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(cache.approximate_count());
            });
        });
    }

    group.finish();
}

/// Benchmark expiry operations
fn bench_expiry(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cache = new_cache(&runtime, 64);

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            cache.set_with_ttl(
                format!("key:{}", i),
                Bytes::from_static(b"value"),
                Duration::from_secs(3600),
            );
            i += 1;
        });
    });

    group.bench_function("exact_count_100k", |b| {
        for i in 0..100_000 {
            cache.set(format!("count:{}", i), Bytes::from_static(b"value"));
        }
        b.iter(|| {
            black_box(cache.exact_count());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_transform,
    bench_concurrent,
    bench_expiry,
);

criterion_main!(benches);
