//! Time-to-live result cache.
//!
//! `DashMap`-backed for concurrent access from many in-flight
//! requests. Correctness comes from lazy expiry on `get` — an expired
//! entry is treated as absent and evicted atomically even if the
//! background sweep has never run. The sweep only bounds memory.
//!
//! No size cap or LRU: TTL is the only eviction policy. Whether a cap
//! is needed for production hardening is an open question (DESIGN.md).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::sweep::{spawn_sweep, SweepHandle};
use common::Clock;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Concurrent key/value cache with per-entry expiry.
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
            clock,
        }
    }

    /// Insert or replace, expiring after `ttl` (default TTL if `None`).
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = self.clock.now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        self.entries.insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Fetch a live value. An entry whose expiry has passed is treated
    /// as absent and evicted on the spot.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entry = self.entries.get(key)?;
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        // Expired: evict unless a concurrent set already replaced it.
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.expires_at);
        before - self.entries.len()
    }

    /// Start the periodic eviction sweep.
    pub fn spawn_sweeper(&self, every: Duration) -> SweepHandle {
        let cache = self.clone();
        spawn_sweep(every, move || {
            let evicted = cache.sweep();
            if evicted > 0 {
                debug!(evicted, remaining = cache.len(), "cache sweep");
            }
        })
    }
}

/// Cache key for a forecast request: the ordered (city, hours) pair.
/// Deterministic, so identical requests always share one entry.
pub fn forecast_key(city: &str, hours: u32) -> String {
    format!("forecast:{city}:{hours}h")
}
