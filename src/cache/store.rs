//! In-memory cache store for flight listings
//!
//! Provides a `CacheStore` that keeps flight listings per logical query key
//! with expiry timestamps, supporting graceful degradation when the upstream
//! API is unavailable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::data::FlightRecord;

/// One cached listing, owned exclusively by the store
#[derive(Debug, Clone)]
struct StoredEntry {
    /// The cached flight records
    records: Vec<FlightRecord>,
    /// When the listing was fetched
    cached_at: DateTime<Utc>,
    /// When the entry stops being fresh
    expires_at: DateTime<Utc>,
    /// Whether pagination aborted mid-way when this listing was fetched
    partial: bool,
}

/// Result of reading from the cache, including freshness metadata
///
/// Carries copies; the store keeps ownership of the entry itself.
#[derive(Debug, Clone)]
pub struct CachedFlights {
    /// The cached flight records
    pub records: Vec<FlightRecord>,
    /// When the listing was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry has outlived its TTL
    pub is_expired: bool,
    /// Whether the listing is incomplete
    pub partial: bool,
}

/// Age and size of one cache entry, as reported by `stats()`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAge {
    /// The cache key
    pub key: String,
    /// Seconds since the entry was cached
    pub age_seconds: i64,
    /// Number of records in the entry
    pub record_count: usize,
    /// Whether the entry has outlived its TTL
    pub is_expired: bool,
    /// Whether the listing is incomplete
    pub partial: bool,
}

/// Snapshot of cache contents and counters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Current number of entries
    pub entries: usize,
    /// Requests answered from a fresh entry
    pub hits: u64,
    /// Requests that had to go upstream
    pub misses: u64,
    /// Requests answered from an expired entry after an upstream failure
    pub stale_hits: u64,
    /// Per-key entry details, sorted by key
    pub keys: Vec<KeyAge>,
}

impl CacheStats {
    /// Fraction of requests answered from fresh cache (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of a clear operation, shaped for the JSON surface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    /// Number of entries removed
    pub cleared_count: usize,
    /// Human-readable summary
    pub message: String,
}

/// Manages cached flight listings in memory
///
/// Entries are created on first write for a key and replaced wholesale on
/// refresh. Expired entries are still returned (with `is_expired = true`) to
/// support graceful degradation. There is no automatic eviction; clearing is
/// manual only. Cloning the store shares the underlying map and counters.
#[derive(Debug, Clone)]
pub struct CacheStore {
    entries: Arc<DashMap<String, StoredEntry>>,
    ttl: chrono::Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    stale_hits: Arc<AtomicU64>,
}

impl CacheStore {
    /// Creates an empty store with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            stale_hits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Writes a listing, replacing any previous entry wholesale
    pub fn write(&self, key: &str, records: Vec<FlightRecord>, partial: bool) {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.entries.insert(
            key.to_string(),
            StoredEntry {
                records,
                cached_at: now,
                expires_at,
                partial,
            },
        );
    }

    /// Reads the entry for a key
    ///
    /// Returns `Some(CachedFlights)` with `is_expired = true` when the entry
    /// exists but has outlived its TTL, and `None` when no entry exists. Does
    /// not touch the hit/miss counters; the gateway records those explicitly.
    pub fn read(&self, key: &str) -> Option<CachedFlights> {
        let entry = self.entries.get(key)?;
        let now = Utc::now();

        Some(CachedFlights {
            records: entry.records.clone(),
            cached_at: entry.cached_at,
            is_expired: now > entry.expires_at,
            partial: entry.partial,
        })
    }

    /// Records a request answered from a fresh entry
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request that had to go upstream
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request answered from an expired entry
    pub(crate) fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes one entry, or all entries when `key` is `None`
    ///
    /// Clearing a key that does not exist is a no-op, not an error.
    pub fn clear(&self, key: Option<&str>) -> ClearOutcome {
        match key {
            Some(key) => match self.entries.remove(key) {
                Some(_) => ClearOutcome {
                    cleared_count: 1,
                    message: format!("cleared cache entry '{}'", key),
                },
                None => ClearOutcome {
                    cleared_count: 0,
                    message: format!("no cache entry for '{}'", key),
                },
            },
            None => {
                let cleared_count = self.entries.len();
                self.entries.clear();
                ClearOutcome {
                    cleared_count,
                    message: format!("cleared {} cache entries", cleared_count),
                }
            }
        }
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of counters and per-key ages
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let mut keys: Vec<KeyAge> = self
            .entries
            .iter()
            .map(|entry| KeyAge {
                key: entry.key().clone(),
                age_seconds: (now - entry.cached_at).num_seconds(),
                record_count: entry.records.len(),
                is_expired: now > entry.expires_at,
                partial: entry.partial,
            })
            .collect();
        keys.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            entries: keys.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            keys,
        }
    }
}
