//! Hit, miss, insert and eviction counters for a cache tree

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by a cache and every alias made with `clone_cache`
///
/// - `hits`: records returned by `get`, `has` answered `true`, empty diffs
/// - `misses`: `get` that found nothing, `has` answered `false`, non-empty diffs
/// - `inserts`: new leaves (overwrites are not counted)
/// - `evictions`: capacity-triggered removals
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`], as reported by `INFO`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Records served plus positive lookups
    pub hits: u64,
    /// Empty or negative lookups
    pub misses: u64,
    /// Records dropped to stay within capacity
    pub evictions: u64,
    /// Leaves created by `set`
    pub inserts: u64,
    /// `hits / (hits + misses)`, zero before the first lookup
    pub hit_ratio: f64,
}

fn bump(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

impl CacheStats {
    /// All counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `n` records served by one `get`
    pub fn record_hits(&self, n: u64) {
        bump(&self.hits, n);
    }

    /// Count one positive lookup
    pub fn record_hit(&self) {
        self.record_hits(1);
    }

    /// Count one empty or negative lookup
    pub fn record_miss(&self) {
        bump(&self.misses, 1);
    }

    /// Count a `has` or `get_diff` outcome
    pub fn record_lookup(&self, hit: bool) {
        if hit {
            self.record_hit();
        } else {
            self.record_miss();
        }
    }

    /// Count one capacity eviction
    pub fn record_eviction(&self) {
        bump(&self.evictions, 1);
    }

    /// Count one new leaf
    pub fn record_insert(&self) {
        bump(&self.inserts, 1);
    }

    /// Hits so far
    pub fn hits(&self) -> u64 {
        read(&self.hits)
    }

    /// Misses so far
    pub fn misses(&self) -> u64 {
        read(&self.misses)
    }

    /// Evictions so far
    pub fn evictions(&self) -> u64 {
        read(&self.evictions)
    }

    /// New leaves so far
    pub fn inserts(&self) -> u64 {
        read(&self.inserts)
    }

    /// Share of lookups that were hits, in `0.0..=1.0`
    pub fn hit_ratio(&self) -> f64 {
        self.snapshot().hit_ratio
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let hits = self.hits();
        let misses = self.misses();
        let lookups = hits + misses;
        StatsSnapshot {
            hits,
            misses,
            evictions: self.evictions(),
            inserts: self.inserts(),
            hit_ratio: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    /// Zero every counter; used by `clear_cache`
    pub fn reset(&self) {
        for counter in [&self.hits, &self.misses, &self.evictions, &self.inserts] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_counts_each_record() {
        let stats = CacheStats::new();

        // One get returning three records, one get returning nothing
        stats.record_hits(3);
        stats.record_miss();

        assert_eq!(stats.hits(), 3);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.hit_ratio(), 0.75);
    }

    #[test]
    fn test_lookup_outcomes() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_ratio(), 0.0);

        stats.record_lookup(true);
        stats.record_lookup(false);
        stats.record_lookup(false);

        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 2);
    }

    #[test]
    fn test_snapshot_serializes_for_info() {
        let stats = CacheStats::new();

        stats.record_insert();
        stats.record_insert();
        stats.record_eviction();
        stats.record_lookup(true);

        let snap = stats.snapshot();
        assert_eq!(snap.inserts, 2);
        assert_eq!(snap.evictions, 1);
        assert_eq!(snap.hit_ratio, 1.0);
        assert_eq!(
            serde_json::to_value(snap).unwrap(),
            serde_json::json!({
                "hits": 1,
                "misses": 0,
                "evictions": 1,
                "inserts": 2,
                "hit_ratio": 1.0,
            })
        );
    }

    #[test]
    fn test_reset_after_clear() {
        let stats = CacheStats::new();
        stats.record_hits(4);
        stats.record_insert();
        stats.record_eviction();

        stats.reset();

        let snap = stats.snapshot();
        assert_eq!((snap.hits, snap.inserts, snap.evictions), (0, 0, 0));
        assert_eq!(snap.hit_ratio, 0.0);
    }
}
