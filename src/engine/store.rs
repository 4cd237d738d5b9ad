//! In-memory cache region with statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CacheStore, Statistic};

/// A stored value and its expiry instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredEntry {
    pub value: Value,
    /// `None` means immortal
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn new(value: Value, lifespan: Option<Duration>) -> Self {
        let expires_at = lifespan
            .and_then(|l| chrono::Duration::from_std(l).ok())
            .and_then(|l| Utc::now().checked_add_signed(l));
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Region statistics collector
#[derive(Debug)]
pub struct RegionStatistics {
    /// When false every `record_*` call is a no-op
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    remove_hits: AtomicU64,
    remove_misses: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,

    // Exponential moving averages, microseconds
    read_latency_us: AtomicU64,
    write_latency_us: AtomicU64,
}

impl RegionStatistics {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Collector that records nothing; every statistic reads zero
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            remove_hits: AtomicU64::new(0),
            remove_misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            read_latency_us: AtomicU64::new(0),
            write_latency_us: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn bump(&self, counter: &AtomicU64) {
        if self.enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_hit(&self) {
        self.bump(&self.hits);
    }

    pub fn record_miss(&self) {
        self.bump(&self.misses);
    }

    pub fn record_remove_hit(&self) {
        self.bump(&self.remove_hits);
    }

    pub fn record_remove_miss(&self) {
        self.bump(&self.remove_misses);
    }

    pub fn record_store(&self) {
        self.bump(&self.stores);
    }

    pub fn record_eviction(&self) {
        self.bump(&self.evictions);
    }

    pub fn record_read_latency(&self, duration: Duration) {
        if self.enabled {
            update_latency_ema(&self.read_latency_us, duration);
        }
    }

    pub fn record_write_latency(&self, duration: Duration) {
        if self.enabled {
            update_latency_ema(&self.write_latency_us, duration);
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn remove_hits(&self) -> u64 {
        self.remove_hits.load(Ordering::Relaxed)
    }

    pub fn remove_misses(&self) -> u64 {
        self.remove_misses.load(Ordering::Relaxed)
    }

    pub fn stores(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Average read time in milliseconds
    pub fn average_read_time_ms(&self) -> f64 {
        self.read_latency_us.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Average write time in milliseconds
    pub fn average_write_time_ms(&self) -> f64 {
        self.write_latency_us.load(Ordering::Relaxed) as f64 / 1000.0
    }
}

impl Default for RegionStatistics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_latency_ema(target: &AtomicU64, duration: Duration) {
    let new_us = duration.as_micros() as u64;
    let alpha = 0.1;

    loop {
        let current = target.load(Ordering::Relaxed);
        let updated = if current == 0 {
            new_us
        } else {
            ((1.0 - alpha) * current as f64 + alpha * new_us as f64) as u64
        };

        if target
            .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            break;
        }
    }
}

/// A named region inside the embedded engine
pub struct Region {
    name: String,
    entries: DashMap<String, StoredEntry>,
    lifespan: Option<Duration>,
    statistics: RegionStatistics,
}

impl Region {
    /// Create an empty region. `lifespan` of `None` keeps entries forever.
    pub fn new(name: impl Into<String>, lifespan: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
            lifespan,
            statistics: RegionStatistics::new(),
        }
    }

    /// Create a region pre-populated from a file store
    pub(crate) fn with_entries(
        name: impl Into<String>,
        lifespan: Option<Duration>,
        entries: impl IntoIterator<Item = (String, StoredEntry)>,
    ) -> Self {
        let region = Self::new(name, lifespan);
        for (key, entry) in entries {
            if !entry.is_expired() {
                region.entries.insert(key, entry);
            }
        }
        region
    }

    /// Stop collecting statistics for this region
    pub fn without_statistics(mut self) -> Self {
        self.statistics = RegionStatistics::disabled();
        self
    }

    pub fn statistics(&self) -> &RegionStatistics {
        &self.statistics
    }

    /// Live entries, for flushing to a file store
    pub(crate) fn snapshot(&self) -> Vec<(String, StoredEntry)> {
        self.entries
            .iter()
            .filter(|e| !e.value().is_expired())
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Drop an expired entry, counting it as an eviction
    fn purge(&self, key: &str) {
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some()
        {
            self.statistics.record_eviction();
        }
    }
}

impl CacheStore for Region {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<Value> {
        let start = Instant::now();

        let found = match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                drop(entry);
                self.purge(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        };

        match found {
            Some(_) => self.statistics.record_hit(),
            None => self.statistics.record_miss(),
        }
        self.statistics.record_read_latency(start.elapsed());
        found
    }

    fn put(&self, key: &str, value: Value) -> Option<Value> {
        let start = Instant::now();

        let previous = self
            .entries
            .insert(key.to_string(), StoredEntry::new(value, self.lifespan))
            .filter(|old| !old.is_expired())
            .map(|old| old.value);

        self.statistics.record_store();
        self.statistics.record_write_latency(start.elapsed());
        previous
    }

    fn remove(&self, key: &str) -> Option<Value> {
        let removed = match self.entries.remove(key) {
            Some((_, entry)) if entry.is_expired() => {
                self.statistics.record_eviction();
                None
            }
            Some((_, entry)) => Some(entry.value),
            None => None,
        };

        match removed {
            Some(_) => self.statistics.record_remove_hit(),
            None => self.statistics.record_remove_miss(),
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.value().is_expired()).count()
    }

    fn statistic(&self, statistic: Statistic) -> f64 {
        let stats = &self.statistics;
        match statistic {
            Statistic::NumberOfEntries => self.len() as f64,
            Statistic::AverageReadTime => stats.average_read_time_ms(),
            Statistic::AverageWriteTime => stats.average_write_time_ms(),
            Statistic::Evictions => stats.evictions() as f64,
            Statistic::Hits => stats.hits() as f64,
            Statistic::Misses => stats.misses() as f64,
            Statistic::RemoveHits => stats.remove_hits() as f64,
            Statistic::RemoveMisses => stats.remove_misses() as f64,
            Statistic::Stores => stats.stores() as f64,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
