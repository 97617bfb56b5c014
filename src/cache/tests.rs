use std::sync::Arc;
use std::time::Duration;

use super::*;

fn manual_cache(config: CacheConfig) -> (AdaptiveCache<&'static str, u32>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = AdaptiveCache::with_clock(config, clock.clone());
    (cache, clock)
}

fn tick(clock: &ManualClock) {
    clock.advance(Duration::from_millis(10));
}

#[test]
fn test_get_returns_inserted_value() {
    let (mut cache, _clock) = manual_cache(CacheConfig::default());
    cache.set("a", 1);
    assert_eq!(cache.get("a"), Some(&1));
    assert_eq!(cache.get("missing"), None);
    assert_eq!(cache.size(), 1);
}

#[test]
fn test_ttl_expires_on_read() {
    let config = CacheConfig {
        ttl: Some(Duration::from_secs(180)),
        ..CacheConfig::default()
    };
    let (mut cache, clock) = manual_cache(config);
    cache.set("a", 1);

    clock.advance(Duration::from_secs(179));
    assert_eq!(cache.get("a"), Some(&1));

    clock.advance(Duration::from_secs(2));
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.size(), 0);
    assert_eq!(cache.stats().expirations, 1);
}

#[test]
fn test_rewrite_resets_ttl() {
    let config = CacheConfig {
        ttl: Some(Duration::from_secs(10)),
        ..CacheConfig::default()
    };
    let (mut cache, clock) = manual_cache(config);
    cache.set("a", 1);
    clock.advance(Duration::from_secs(8));
    cache.set("a", 2);
    clock.advance(Duration::from_secs(8));
    assert_eq!(cache.get("a"), Some(&2));
}

#[test]
fn test_lru_k_evicts_least_recently_reaccessed() {
    let config = CacheConfig {
        max_size: 3,
        lru_k: 2,
        ..CacheConfig::default()
    };
    let (mut cache, clock) = manual_cache(config);

    cache.set("A", 1);
    tick(&clock);
    cache.set("B", 2);
    tick(&clock);
    cache.set("C", 3);
    tick(&clock);
    cache.get("A");
    tick(&clock);
    cache.get("A");
    tick(&clock);
    cache.set("D", 4);

    assert!(cache.contains_key("A"));
    assert!(!cache.contains_key("B"));
    assert!(cache.contains_key("C"));
    assert!(cache.contains_key("D"));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_single_access_does_not_protect_with_k2() {
    let config = CacheConfig {
        max_size: 2,
        lru_k: 2,
        ..CacheConfig::default()
    };
    let (mut cache, clock) = manual_cache(config);

    cache.set("old", 1);
    tick(&clock);
    cache.set("new", 2);
    tick(&clock);
    // One access is fewer than K, so "old" still ranks by its write time
    cache.get("old");
    tick(&clock);
    cache.set("third", 3);

    assert!(!cache.contains_key("old"));
    assert!(cache.contains_key("new"));
}

#[test]
fn test_proactive_threshold_evicts_early() {
    let config = CacheConfig {
        max_size: 10,
        proactive_eviction_threshold: 0.5,
        ..CacheConfig::default()
    };
    let (mut cache, clock) = manual_cache(config);
    for key in ["a", "b", "c", "d", "e", "f", "g"] {
        cache.set(key, 0);
        tick(&clock);
    }
    assert_eq!(cache.size(), 5);
    assert!(!cache.contains_key("a"));
    assert!(!cache.contains_key("b"));
}

#[test]
fn test_low_priority_evicted_first() {
    let config = CacheConfig {
        max_size: 2,
        ..CacheConfig::default()
    };
    let clock = Arc::new(ManualClock::new());
    let mut cache: AdaptiveCache<&'static str, u32> =
        AdaptiveCache::with_clock(config, clock.clone())
            .with_priority(|key, _| if *key == "pinned" { 10.0 } else { 0.0 });

    cache.set("pinned", 1);
    tick(&clock);
    cache.set("other", 2);
    tick(&clock);
    cache.set("third", 3);

    assert!(cache.contains_key("pinned"));
    assert!(!cache.contains_key("other"));
}

#[test]
fn test_failing_priority_falls_back() {
    let config = CacheConfig {
        max_size: 2,
        ..CacheConfig::default()
    };
    let clock = Arc::new(ManualClock::new());
    let mut cache: AdaptiveCache<&'static str, u32> =
        AdaptiveCache::with_clock(config, clock.clone()).with_priority(|key, _| {
            if *key == "bad" {
                panic!("priority lookup failed");
            }
            f64::NAN
        });

    cache.set("bad", 1);
    tick(&clock);
    cache.set("nan", 2);
    tick(&clock);
    cache.set("next", 3);

    // Both fall back to the default priority, so plain LRU-K order applies
    assert!(!cache.contains_key("bad"));
    assert!(cache.contains_key("nan"));
    assert!(cache.contains_key("next"));
}

#[test]
fn test_size_estimator_tracks_total() {
    let clock = Arc::new(ManualClock::new());
    let mut cache: AdaptiveCache<&'static str, String> =
        AdaptiveCache::with_clock(CacheConfig::default(), clock).with_size_estimator(String::len);

    cache.set("a", "hello".to_string());
    cache.set("b", "hi".to_string());
    assert_eq!(cache.estimated_size(), 7);

    cache.set("a", "x".to_string());
    assert_eq!(cache.estimated_size(), 3);

    cache.delete("b");
    assert_eq!(cache.estimated_size(), 1);

    cache.clear();
    assert_eq!(cache.estimated_size(), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_failing_size_estimator_uses_fallback() {
    let clock = Arc::new(ManualClock::new());
    let mut cache: AdaptiveCache<&'static str, u64> =
        AdaptiveCache::with_clock(CacheConfig::default(), clock)
            .with_size_estimator(|_| panic!("cannot size"));
    cache.set("a", 7);
    assert_eq!(cache.estimated_size(), std::mem::size_of::<u64>());
}

#[test]
fn test_purge_expired() {
    let config = CacheConfig {
        ttl: Some(Duration::from_secs(5)),
        ..CacheConfig::default()
    };
    let (mut cache, clock) = manual_cache(config);
    cache.set("a", 1);
    clock.advance(Duration::from_secs(3));
    cache.set("b", 2);
    clock.advance(Duration::from_secs(3));

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn test_stats_count_hits_and_misses() {
    let (mut cache, _clock) = manual_cache(CacheConfig::default());
    cache.set("a", 1);
    cache.get("a");
    cache.get("a");
    cache.get("b");
    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
}
