//! In-memory expiring map.
//!
//! Both the timetable cache and the failure threshold cache are instances
//! of [`ExpiringMap`]. Each entry carries its own TTL. Whether an entry is
//! still visible is decided on read, against the injected [`Clock`], so an
//! expired entry is absent even if it has not been evicted yet. moka evicts
//! entries with the same per-entry TTL in the background.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::future::Cache as MokaCache;

use crate::clock::Clock;

/// Configuration for a cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1000,
        }
    }
}

/// A stored value with its expiry.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
    expires_at: DateTime<Utc>,
}

/// Evict each entry after its own TTL; an overwrite restarts the TTL.
struct PerEntryTtl;

impl<K, V> Expiry<K, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Key → value map whose entries expire individually.
///
/// Safe to share between tasks: readers see either the old or the new
/// value for a key, never a mix.
pub struct ExpiringMap<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    entries: MokaCache<K, Entry<V>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty map that reads time from `clock`.
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { entries, clock }
    }

    /// Get the value for `key`, unless it was never set or has expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key).await?;
        (self.clock.now() < entry.expires_at).then_some(entry.value)
    }

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    pub async fn put(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.entries
            .insert(
                key,
                Entry {
                    value,
                    ttl,
                    expires_at,
                },
            )
            .await;
    }

    /// Number of stored entries, expired or not (for monitoring).
    ///
    /// moka updates this count lazily; call [`sync`](Self::sync) first for
    /// an exact figure.
    pub fn size(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Run pending cache maintenance so that [`size`](Self::size) is current.
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }
}
