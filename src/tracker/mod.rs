//! Expiring result cache.
//!
//! Maps a [`TrackerId`] to a completed job result for a bounded time. A
//! lookup after the deadline reports "not found" whether or not the sweeper
//! has evicted the entry yet, so callers cannot tell an expired key from one
//! that never existed. Reads never extend an entry's lifetime.

use dashmap::DashMap;
use music_channel_common::TrackerId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL cache keyed by tracker id.
pub struct ResultCache<V> {
    entries: DashMap<TrackerId, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    /// Create a new cache whose [`insert`](Self::insert) uses `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or overwrite `key`, (re)starting its timer at `ttl`.
    pub fn put(&self, key: TrackerId, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Insert with the cache's default TTL.
    pub fn insert(&self, key: TrackerId, value: V) {
        self.put(key, value, self.default_ttl);
    }

    /// Look up a live entry.
    pub fn get(&self, key: &TrackerId) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Evict every entry whose deadline has passed.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            if entry.is_expired(now) {
                tracing::debug!(tracker_id = %key, "Expired result evicted");
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            tracing::info!(removed, "Swept expired results");
        }

        removed
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Start a background task that periodically sweeps expired entries.
pub fn start_sweeper<V>(cache: Arc<ResultCache<V>>, interval: Duration) -> tokio::task::JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            cache.cleanup_expired();
        }
    })
}
