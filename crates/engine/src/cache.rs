//! Shared query result cache.
//!
//! The cache is shared across the whole dispatcher lifetime. Readers never
//! block each other, and writers to the same key serialise on the key's
//! shard, so two identical queries racing to populate an entry can at worst
//! both store a complete value.

use dashmap::DashMap;
use p4runner_core::{ClientServerRef, ServerName};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Cache key: where a query was sent plus its serialized payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Server the query went to
    pub server: ServerName,
    /// Client workspace, for client-scoped queries
    pub client: Option<ClientServerRef>,
    /// Canonical serialized request
    pub request: String,
}

/// A cached value and when it was stored.
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
    /// The cached value
    pub value: V,
    /// Store time
    pub stored_at: Instant,
}

impl<V> CachedEntry<V> {
    /// Whether the entry is younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Read cache consulted by queries.
///
/// A dispatcher without a cache simply always dispatches.
pub trait QueryCache<V>: Send + Sync {
    /// Cached entry for `key`, fresh or not
    fn lookup(&self, key: &CacheKey) -> Option<CachedEntry<V>>;

    /// Store `value` under `key`, replacing any previous entry
    fn store(&self, key: CacheKey, value: V);

    /// Drop every entry for `server`
    fn invalidate_server(&self, server: &ServerName);

    /// Drop everything
    fn clear(&self);

    /// Number of entries
    fn len(&self) -> usize;

    /// Whether the cache holds nothing
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Stamped<V> {
    entry: CachedEntry<V>,
    stamp: u64,
}

/// In-memory cache bounded by entry count; the oldest entry goes first.
pub struct MemoryQueryCache<V> {
    entries: DashMap<CacheKey, Stamped<V>>,
    stamps: AtomicU64,
    max_entries: usize,
}

impl<V> MemoryQueryCache<V> {
    /// Create a cache holding at most `max_entries` (minimum 1)
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            stamps: AtomicU64::new(0),
            max_entries: max_entries.max(1),
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().stamp)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            trace!(server = %key.server, "evicting cached query");
            self.entries.remove(&key);
        }
    }
}

impl<V: Clone + Send + Sync> QueryCache<V> for MemoryQueryCache<V> {
    fn lookup(&self, key: &CacheKey) -> Option<CachedEntry<V>> {
        self.entries.get(key).map(|e| e.entry.clone())
    }

    fn store(&self, key: CacheKey, value: V) {
        let stamp = self.stamps.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key,
            Stamped {
                entry: CachedEntry {
                    value,
                    stored_at: Instant::now(),
                },
                stamp,
            },
        );
        while self.entries.len() > self.max_entries {
            self.evict_oldest();
        }
    }

    fn invalidate_server(&self, server: &ServerName) {
        self.entries.retain(|k, _| &k.server != server);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
