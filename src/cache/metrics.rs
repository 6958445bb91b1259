//! Cache Metrics
//!
//! Lock-free counters shared by every backend, turned into a
//! [`CacheStats`] snapshot on demand.

use crate::cache::{BackendKind, CacheStats};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Per-backend operation counters, aligned to prevent false sharing
#[repr(C, align(64))]
#[derive(Debug)]
pub struct CacheMetrics {
    /// Lookups that returned a live value
    pub hits: AtomicU64,
    /// Lookups that found nothing (including expired entries)
    pub misses: AtomicU64,
    /// Successful writes
    pub sets: AtomicU64,
    /// Keys removed by explicit delete or pattern invalidation
    pub deletes: AtomicU64,
    /// Keys removed to stay under the size budget
    pub evictions: AtomicU64,
    /// Keys removed because their TTL elapsed
    pub expirations: AtomicU64,
    started_at: Instant,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    /// Fraction of lookups that hit (0.0 before any lookup)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Fraction of lookups that missed (0.0 before any lookup)
    pub fn miss_rate(&self) -> f64 {
        let misses = self.misses.load(Ordering::Relaxed);
        let total = misses + self.hits.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            misses as f64 / total as f64
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Build a stats snapshot from these counters plus backend-specific sizes
    pub fn snapshot(&self, backend_kind: BackendKind, key_count: u64, memory_usage_bytes: u64) -> CacheStats {
        CacheStats {
            key_count,
            memory_usage_bytes,
            hit_rate: self.hit_rate(),
            miss_rate: self.miss_rate(),
            uptime_ms: self.uptime_ms(),
            backend_kind,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_without_lookups() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hit_rate(), 0.0);
        assert_eq!(metrics.miss_rate(), 0.0);
    }

    #[test]
    fn test_rates() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();

        assert!((metrics.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!((metrics.miss_rate() - 0.25).abs() < f64::EPSILON);

        let stats = metrics.snapshot(BackendKind::Memory, 3, 120);
        assert_eq!(stats.key_count, 3);
        assert_eq!(stats.memory_usage_bytes, 120);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.backend_kind, BackendKind::Memory);
    }

    #[test]
    fn test_write_counters_in_snapshot() {
        let metrics = CacheMetrics::new();
        metrics.record_set();
        metrics.record_set();
        metrics.record_deletes(3);

        let stats = metrics.snapshot(BackendKind::File, 0, 0);
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.deletes, 3);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(std::mem::align_of::<CacheMetrics>(), 64);
    }
}
