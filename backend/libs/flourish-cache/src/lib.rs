//! Flourish query cache
//!
//! Time-bounded, in-memory key/value store for read-mostly data on the media
//! read path (category listings, per-user like/follow sets):
//! - One default TTL per instance, optional per-entry TTL
//! - Negative caching (error entries with no data)
//! - Background janitor for physical expiry
//! - Unified, versioned key schema
//! - Metrics integration
//!
//! # Staleness
//!
//! `get` and `get_error` compare an entry's age against the instance's
//! *default* TTL, whatever TTL the entry was stored with. A longer per-entry
//! TTL therefore never extends the readable lifetime of an entry; it only
//! delays physical removal by [`QueryCache::purge_expired`].
//!
//! Time is read from `tokio::time::Instant`, so a paused test runtime can
//! advance the clock deterministically.

mod error;
mod keys;
mod metrics;

pub use error::{CacheError, CacheResult};
pub use keys::{CacheKey, CACHE_VERSION};
pub use metrics::CacheMetrics;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default TTL values
pub mod ttl {
    use std::time::Duration;

    pub const DEFAULT: Duration = Duration::from_secs(300); // 5 minutes
    pub const JANITOR_INTERVAL: Duration = Duration::from_secs(60);
}

/// A stored value, or an error sentinel when `data` is `None`
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: Option<T>,
    pub timestamp: Instant,
    pub ttl: Duration,
    pub error: Option<String>,
}

impl<T> CacheEntry<T> {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    fn is_fresh(&self, now: Instant, max_age: Duration) -> bool {
        self.age(now) < max_age
    }

    /// Whether the entry's own TTL has run out
    pub fn is_expired(&self, now: Instant) -> bool {
        !self.is_fresh(now, self.ttl)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Time-bounded cache keyed by opaque strings
///
/// Internally sharded, so one instance can be shared behind an `Arc` by
/// request handlers and background tasks.
pub struct QueryCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    default_ttl: Duration,
    metrics: CacheMetrics,
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// `name` labels this instance in metrics and logs
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            metrics: CacheMetrics::new(name),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store `data`, replacing any existing entry for `key`
    pub fn set(&self, key: impl Into<String>, data: T, ttl: Option<Duration>) {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        self.metrics.record_write();
        self.entries.insert(
            key,
            CacheEntry {
                data: Some(data),
                timestamp: Instant::now(),
                ttl,
                error: None,
            },
        );
    }

    /// Fresh value for `key`, evicting the entry if it is stale
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(now, self.default_ttl) {
                return match &entry.data {
                    Some(data) => {
                        debug!(key = %key, "Cache hit");
                        self.metrics.record_hit();
                        Some(data.clone())
                    }
                    None => {
                        debug!(key = %key, "Cache negative hit");
                        self.metrics.record_negative_hit();
                        None
                    }
                };
            }
        } else {
            debug!(key = %key, "Cache miss");
            self.metrics.record_miss();
            return None;
        }

        self.evict_stale(key, now);
        self.metrics.record_miss();
        None
    }

    /// Raw presence check, stale entries included
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn delete(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!(key = %key, "Cache delete");
            self.metrics.record_invalidation(1);
        }
    }

    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();

        debug!(count = count, "Cache cleared");
        self.metrics.record_invalidation(count);
    }

    /// Remember a failure for `key` so repeated misses skip the remote call
    pub fn set_error(&self, key: impl Into<String>, error: impl ToString) {
        let key = key.into();
        let error = error.to_string();

        debug!(key = %key, error = %error, "Cache set negative");
        self.metrics.record_negative_write();
        self.entries.insert(
            key,
            CacheEntry {
                data: None,
                timestamp: Instant::now(),
                ttl: self.default_ttl,
                error: Some(error),
            },
        );
    }

    /// Cached error for `key`, under the same staleness rule as `get`
    pub fn get_error(&self, key: &str) -> Option<String> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(now, self.default_ttl) {
                return entry.error.clone();
            }
        } else {
            return None;
        }

        self.evict_stale(key, now);
        None
    }

    /// Raw entry count, stale entries included
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every key starting with `prefix`, returning how many were removed
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let keep = !key.starts_with(prefix);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!(prefix = %prefix, removed = removed, "Cache prefix invalidation");
            self.metrics.record_invalidation(removed);
        }
        removed
    }

    /// Physically remove entries whose own TTL has elapsed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!(removed = removed, "Cache purged expired entries");
            self.metrics.record_eviction(removed);
        }
        removed
    }

    /// Run `purge_expired` every `interval` until the cache is dropped.
    /// A zero interval falls back to `ttl::JANITOR_INTERVAL`.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let interval = if interval.is_zero() {
            warn!("Zero janitor interval, using default");
            ttl::JANITOR_INTERVAL
        } else {
            interval
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => {
                        debug!("Cache dropped, janitor exiting");
                        break;
                    }
                }
            }
        })
    }

    fn evict_stale(&self, key: &str, now: Instant) {
        let max_age = self.default_ttl;
        // Re-checked under the shard lock: a concurrent `set` may have replaced it
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_fresh(now, max_age))
            .is_some()
        {
            debug!(key = %key, "Cache evicted stale entry");
            self.metrics.record_eviction(1);
        }
    }
}

/// Cache of arbitrary JSON values, the shape of the process-wide instance
pub type JsonCache = QueryCache<serde_json::Value>;

impl QueryCache<serde_json::Value> {
    /// Typed read; an entry that no longer matches `V` is dropped
    pub fn get_json<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let value = self.get(key)?;
        match serde_json::from_value::<V>(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache deserialization failed");
                self.delete(key);
                None
            }
        }
    }

    pub fn set_json<V: Serialize>(
        &self,
        key: impl Into<String>,
        value: &V,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl);
        Ok(())
    }
}

static GLOBAL: OnceLock<JsonCache> = OnceLock::new();

/// Process-wide cache with the default 5 minute TTL
///
/// Created on first use and never torn down; only `clear()` empties it.
pub fn global() -> &'static JsonCache {
    GLOBAL.get_or_init(|| QueryCache::new("global", ttl::DEFAULT))
}
