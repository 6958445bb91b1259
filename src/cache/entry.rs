//! Cache Entry Types
//!
//! The memory backend's per-key record and its size estimate.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Fixed bookkeeping cost charged per entry when estimating memory usage
pub const DEFAULT_ENTRY_OVERHEAD_BYTES: u64 = 64;

// =============================================================================
// Cache Entry
// =============================================================================

/// A cached value with its lifetime and access metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached JSON value
    pub value: Value,
    /// Time-to-live in seconds
    pub ttl_seconds: u64,
    /// Time when the entry was written
    pub created_at: DateTime<Utc>,
    /// Time of the last read or write
    pub accessed_at: DateTime<Utc>,
    /// Number of reads since the entry was written
    pub access_count: u64,
    /// Instant after which the entry is considered absent
    pub expires_at: DateTime<Utc>,
    /// Estimated footprint (key + serialized value + overhead)
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Create a new entry for `key`
    pub fn new(key: &str, value: Value, ttl_seconds: u64, overhead_bytes: u64) -> Self {
        let now = Utc::now();
        let size_bytes = estimate_size(key, &value, overhead_bytes);
        Self {
            value,
            ttl_seconds,
            created_at: now,
            accessed_at: now,
            access_count: 0,
            expires_at: expiry_after(now, ttl_seconds),
            size_bytes,
        }
    }

    /// Record a read
    pub fn record_access(&mut self) {
        self.accessed_at = Utc::now();
        self.access_count += 1;
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against a given instant (expired at and after `expires_at`)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Get age in seconds since creation
    pub fn age_seconds(&self) -> u64 {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.num_seconds().max(0) as u64
    }
}

/// Estimate the footprint of a key/value pair
pub fn estimate_size(key: &str, value: &Value, overhead_bytes: u64) -> u64 {
    let value_bytes = serde_json::to_string(value).map(|s| s.len()).unwrap_or(0);
    key.len() as u64 + value_bytes as u64 + overhead_bytes
}

/// `start + ttl_seconds`, saturating at the largest representable instant
pub fn expiry_after(start: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    let ttl = Duration::seconds(ttl_seconds.min(i64::MAX as u64 / 1000) as i64);
    start
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_size_estimate() {
        let value = json!({"a": 1});
        // `{"a":1}` is 7 bytes
        assert_eq!(estimate_size("key", &value, 64), 3 + 7 + 64);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new("k", json!(1), u64::MAX, DEFAULT_ENTRY_OVERHEAD_BYTES);
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new("k", json!("v"), 3600, DEFAULT_ENTRY_OVERHEAD_BYTES);
        assert!(!entry.is_expired());
        assert!(entry.is_expired_at(entry.expires_at));
        assert!(entry.is_expired_at(entry.created_at + Duration::seconds(3601)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new("k", json!(null), 0, 0);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_record_access() {
        let mut entry = CacheEntry::new("k", json!(1), 60, 0);
        assert_eq!(entry.access_count, 0);
        entry.record_access();
        entry.record_access();
        assert_eq!(entry.access_count, 2);
        assert!(entry.accessed_at >= entry.created_at);
    }
}
