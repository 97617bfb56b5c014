//! TTL + LRU-K + priority-weighted cache.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::trace;

use super::clock::{Clock, SystemClock};

/// Priority used when no priority function is installed or it fails.
const DEFAULT_PRIORITY: f64 = 1.0;

type PriorityFn<K, V> = Box<dyn Fn(&K, &V) -> f64 + Send + Sync>;
type SizeFn<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

/// Cache sizing and expiry settings.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheConfig {
    /// Hard upper bound on the number of entries
    pub max_size: usize,
    /// Entries older than this (since last write) are dropped on read
    pub ttl: Option<Duration>,
    /// Number of access timestamps kept per entry (the K in LRU-K)
    pub lru_k: usize,
    /// Fraction of `max_size` at which eviction starts before the hard bound
    pub proactive_eviction_threshold: f64,
    /// How far one unit of priority shifts an entry's eviction score
    pub priority_weight: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl: Some(Duration::from_secs(180)),
            lru_k: 2,
            proactive_eviction_threshold: 0.9,
            priority_weight: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Entry count at which `set` starts evicting.
    fn eviction_limit(&self) -> usize {
        let max = self.max_size.max(1);
        let threshold = if self.proactive_eviction_threshold.is_finite()
            && self.proactive_eviction_threshold > 0.0
        {
            self.proactive_eviction_threshold.min(1.0)
        } else {
            1.0
        };
        let proactive = (max as f64 * threshold).ceil() as usize;
        proactive.clamp(1, max)
    }
}

/// Counters describing cache behaviour since creation (or the last `clear`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct CacheEntry<V> {
    value: V,
    written_at: Instant,
    /// Most recent access last; capped to `lru_k` entries
    access_history: VecDeque<Instant>,
    access_count: u64,
    estimated_size: usize,
}

impl<V> CacheEntry<V> {
    /// The timestamp LRU-K ranks by: the K-th most recent access, or the
    /// write time if fewer than K accesses were recorded.
    fn reference_time(&self, k: usize) -> Instant {
        if k > 0 && self.access_history.len() >= k {
            self.access_history[self.access_history.len() - k]
        } else {
            self.written_at
        }
    }

    fn last_touched(&self) -> Instant {
        self.access_history
            .back()
            .copied()
            .unwrap_or(self.written_at)
    }
}

/// Ranking key for eviction; the smallest candidate is evicted first.
struct EvictionRank {
    score: f64,
    last_touched: Instant,
    access_count: u64,
}

impl EvictionRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.last_touched.cmp(&other.last_touched))
            .then(self.access_count.cmp(&other.access_count))
    }
}

/// A bounded key/value store with TTL, LRU-K and priority-weighted eviction.
///
/// Entries are kept in insertion order, so among equally ranked candidates
/// the oldest insertion is evicted first.
pub struct AdaptiveCache<K, V> {
    entries: IndexMap<K, CacheEntry<V>, FxBuildHasher>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    epoch: Instant,
    priority: Option<PriorityFn<K, V>>,
    size_of: Option<SizeFn<V>>,
    total_size: usize,
    stats: CacheStats,
}

impl<K, V> fmt::Debug for AdaptiveCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveCache")
            .field("len", &self.entries.len())
            .field("config", &self.config)
            .field("total_size", &self.total_size)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K: Hash + Eq, V> AdaptiveCache<K, V> {
    /// Create a cache reading time from the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let epoch = clock.now();
        Self {
            entries: IndexMap::with_hasher(FxBuildHasher),
            config,
            clock,
            epoch,
            priority: None,
            size_of: None,
            total_size: 0,
            stats: CacheStats::default(),
        }
    }

    /// Install a priority function. Lower priority means earlier eviction.
    pub fn with_priority(
        mut self,
        priority: impl Fn(&K, &V) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.priority = Some(Box::new(priority));
        self
    }

    /// Install a size estimator used for [`estimated_size`](Self::estimated_size).
    pub fn with_size_estimator(
        mut self,
        size_of: impl Fn(&V) -> usize + Send + Sync + 'static,
    ) -> Self {
        self.size_of = Some(Box::new(size_of));
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a value, recording the access.
    ///
    /// Returns `None` (and drops the entry) when its TTL has elapsed.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let Some(index) = self.entries.get_index_of(key) else {
            self.stats.misses += 1;
            return None;
        };

        if self.is_expired(&self.entries[index], now) {
            self.remove_index(index);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }

        let k = self.config.lru_k.max(1);
        let entry = &mut self.entries[index];
        entry.access_history.push_back(now);
        while entry.access_history.len() > k {
            entry.access_history.pop_front();
        }
        entry.access_count += 1;
        self.stats.hits += 1;
        Some(&entry.value)
    }

    /// Check for a live entry without recording an access.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Insert or replace a value, evicting as needed.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(index) = self.entries.get_index_of(&key) {
            self.remove_index(index);
        }

        let max_size = self.config.max_size.max(1);
        let limit = self.config.eviction_limit();
        while !self.entries.is_empty()
            && (self.entries.len() >= max_size || self.entries.len() >= limit)
        {
            self.evict_one();
        }

        let estimated_size = self.estimate_size(&value);
        self.total_size += estimated_size;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                written_at: self.clock.now(),
                access_history: VecDeque::with_capacity(self.config.lru_k.max(1)),
                access_count: 0,
                estimated_size,
            },
        );
    }

    /// Remove an entry, returning its value.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.entries.get_index_of(key)?;
        self.remove_index(index)
    }

    /// Drop every entry and reset statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
        self.stats = CacheStats::default();
    }

    /// Drop every entry whose TTL has elapsed. Returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        let ttl = self.config.ttl;
        let mut freed = 0;
        self.entries.retain(|_, entry| {
            let keep = ttl.is_none_or(|ttl| now.saturating_duration_since(entry.written_at) <= ttl);
            if !keep {
                freed += entry.estimated_size;
            }
            keep
        });
        self.total_size = self.total_size.saturating_sub(freed);
        let dropped = before - self.entries.len();
        self.stats.expirations += dropped as u64;
        dropped
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the estimated sizes of all live entries.
    pub fn estimated_size(&self) -> usize {
        self.total_size
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.written_at) > ttl)
    }

    fn remove_index(&mut self, index: usize) -> Option<V> {
        // shift_remove keeps insertion order for tie-breaking
        let (_, entry) = self.entries.shift_remove_index(index)?;
        self.total_size = self.total_size.saturating_sub(entry.estimated_size);
        Some(entry.value)
    }

    fn evict_one(&mut self) {
        let k = self.config.lru_k.max(1);
        let victim = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, (key, entry))| (index, self.rank(key, entry, k)))
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(index, _)| index);

        if let Some(index) = victim {
            trace!("[ADAPTIVE_CACHE] evicting entry at index {}", index);
            self.remove_index(index);
            self.stats.evictions += 1;
        }
    }

    fn rank(&self, key: &K, entry: &CacheEntry<V>, k: usize) -> EvictionRank {
        let reference = entry.reference_time(k);
        let age_ms = reference.saturating_duration_since(self.epoch).as_secs_f64() * 1000.0;
        let weight_ms = self.config.priority_weight.as_secs_f64() * 1000.0;
        let priority = self.priority_of(key, &entry.value);
        EvictionRank {
            score: age_ms + priority * weight_ms,
            last_touched: entry.last_touched(),
            access_count: entry.access_count,
        }
    }

    fn priority_of(&self, key: &K, value: &V) -> f64 {
        let Some(priority) = &self.priority else {
            return DEFAULT_PRIORITY;
        };
        panic::catch_unwind(AssertUnwindSafe(|| priority(key, value)))
            .ok()
            .filter(|p| p.is_finite())
            .unwrap_or(DEFAULT_PRIORITY)
    }

    fn estimate_size(&self, value: &V) -> usize {
        let fallback = std::mem::size_of::<V>();
        match &self.size_of {
            Some(size_of) => {
                panic::catch_unwind(AssertUnwindSafe(|| size_of(value))).unwrap_or(fallback)
            }
            None => fallback,
        }
    }
}
