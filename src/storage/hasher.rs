//! Key Hashing for Shard Routing
//!
//! Every key is hashed exactly once per operation to pick the shard that
//! owns it. The hash only has to be deterministic and spread keys evenly;
//! it is never used for anything security related.
//!
//! The default is 64-bit FNV-1a, which is fast for the short string keys a
//! cache usually sees. Anything implementing [`KeyHasher`] can be plugged in
//! through [`CacheConfig::with_hasher`](crate::config::CacheConfig::with_hasher),
//! including plain closures.

/// Maps a key to a 64-bit hash used for shard routing.
///
/// Implementations must be pure: the same key always yields the same hash
/// for the lifetime of the cache, otherwise a key could be routed to a
/// shard that does not hold it.
pub trait KeyHasher: Send + Sync {
    fn hash_key(&self, key: &[u8]) -> u64;
}

impl<F> KeyHasher for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    #[inline]
    fn hash_key(&self, key: &[u8]) -> u64 {
        self(key)
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1a;

impl KeyHasher for Fnv1a {
    #[inline]
    fn hash_key(&self, key: &[u8]) -> u64 {
        key.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        })
    }
}
