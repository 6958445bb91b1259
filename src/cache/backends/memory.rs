//! In-Memory Backend
//!
//! Process-local cache with lazy TTL expiry, an optional size budget and
//! least-recently-accessed eviction. Entries live in an `IndexMap` kept in
//! access order (front = oldest access, back = newest), so eviction walks
//! from the front.

use crate::cache::cleanup::{spawn_sweeper, ExpirySweeper, SweeperHandle};
use crate::cache::entry::{CacheEntry, DEFAULT_ENTRY_OVERHEAD_BYTES};
use crate::cache::metrics::CacheMetrics;
use crate::cache::pattern::KeyPattern;
use crate::cache::{BackendKind, CacheBackend, CacheStats, DEFAULT_TTL_SECONDS};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Memory Backend Configuration
// =============================================================================

/// Configuration for the memory backend
#[derive(Debug, Clone)]
pub struct MemoryBackendConfig {
    /// Size budget in bytes (None = unbounded)
    pub max_memory_bytes: Option<u64>,
    /// TTL applied when a write omits one
    pub default_ttl_seconds: u64,
    /// Fixed per-entry cost added to key and value sizes
    pub entry_overhead_bytes: u64,
    /// Extra bytes freed beyond the overage when evicting
    pub eviction_buffer_bytes: u64,
    /// Interval of the background expiry sweep (None = no sweep)
    pub sweep_interval: Option<Duration>,
    /// Deterministic execution: never start the sweep
    pub test_mode: bool,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: None,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            entry_overhead_bytes: DEFAULT_ENTRY_OVERHEAD_BYTES,
            eviction_buffer_bytes: 1024,
            sweep_interval: Some(Duration::from_secs(300)),
            test_mode: false,
        }
    }
}

impl MemoryBackendConfig {
    /// Configuration for tests: no background sweep
    pub fn for_tests() -> Self {
        Self {
            sweep_interval: None,
            test_mode: true,
            ..Default::default()
        }
    }

    /// Set the size budget
    pub fn with_budget(mut self, max_memory_bytes: u64) -> Self {
        self.max_memory_bytes = Some(max_memory_bytes);
        self
    }
}

// =============================================================================
// Entry Table
// =============================================================================

/// Entries plus their summed size; guarded by one lock so the
/// eviction scan and its deletes are a single critical section
#[derive(Debug, Default)]
struct EntryTable {
    entries: IndexMap<String, CacheEntry>,
    usage_bytes: u64,
}

impl EntryTable {
    fn insert(&mut self, key: String, entry: CacheEntry) {
        self.usage_bytes += entry.size_bytes;
        if let Some(old) = self.entries.insert(key, entry) {
            self.usage_bytes = self.usage_bytes.saturating_sub(old.size_bytes);
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.shift_remove(key)?;
        self.usage_bytes = self.usage_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    /// Move a key to the most-recently-accessed position
    fn touch(&mut self, key: &str) -> Option<&CacheEntry> {
        let (key, mut entry) = self.entries.shift_remove_entry(key)?;
        entry.record_access();
        self.entries.insert(key.clone(), entry);
        self.entries.get(&key)
    }

    /// Evict least-recently-accessed entries until `bytes_to_free` is reached
    /// or the table is empty. Returns (entries evicted, bytes freed).
    fn evict_oldest(&mut self, bytes_to_free: u64) -> (u64, u64) {
        let mut evicted = 0u64;
        let mut freed = 0u64;

        while freed < bytes_to_free {
            match self.entries.shift_remove_index(0) {
                Some((_, entry)) => {
                    freed += entry.size_bytes;
                    evicted += 1;
                }
                None => break,
            }
        }

        self.usage_bytes = self.usage_bytes.saturating_sub(freed);
        (evicted, freed)
    }

    fn purge_expired(&mut self) -> u64 {
        let now = Utc::now();
        let before = self.entries.len();
        let mut freed = 0u64;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired_at(now);
            if expired {
                freed += entry.size_bytes;
            }
            !expired
        });
        self.usage_bytes = self.usage_bytes.saturating_sub(freed);
        (before - self.entries.len()) as u64
    }
}

// =============================================================================
// Memory Backend
// =============================================================================

/// In-memory cache backend
pub struct MemoryBackend {
    table: Mutex<EntryTable>,
    config: MemoryBackendConfig,
    metrics: CacheMetrics,
}

impl MemoryBackend {
    /// Create new memory backend
    pub fn new(config: MemoryBackendConfig) -> Self {
        Self {
            table: Mutex::new(EntryTable::default()),
            config,
            metrics: CacheMetrics::new(),
        }
    }

    /// Start the periodic expiry sweep.
    ///
    /// Returns None in test mode or when no interval is configured.
    pub fn start_sweeper(self: &Arc<Self>) -> Option<SweeperHandle> {
        if self.config.test_mode {
            return None;
        }
        let interval = self.config.sweep_interval?;
        spawn_sweeper(self, interval)
    }

    /// Current estimated usage in bytes
    pub fn usage_bytes(&self) -> u64 {
        self.table.lock().usage_bytes
    }

    /// Number of stored entries (including not-yet-purged expired ones)
    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the configuration
    pub fn config(&self) -> &MemoryBackendConfig {
        &self.config
    }

    /// Access metadata for a key, if present
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.table.lock().entries.get(key).cloned()
    }
}

impl ExpirySweeper for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn purge_expired(&self) -> u64 {
        let purged = self.table.lock().purge_expired();
        self.metrics.record_expirations(purged);
        purged
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut table = self.table.lock();

        let expired = match table.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.metrics.record_miss();
                return Ok(None);
            }
        };

        if expired {
            table.remove(key);
            self.metrics.record_expirations(1);
            self.metrics.record_miss();
            return Ok(None);
        }

        let value = table.touch(key).map(|entry| entry.value.clone());
        self.metrics.record_hit();
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) -> Result<()> {
        let ttl = ttl_seconds.unwrap_or(self.config.default_ttl_seconds);
        let entry = CacheEntry::new(key, value, ttl, self.config.entry_overhead_bytes);
        let size = entry.size_bytes;

        let mut table = self.table.lock();

        // Overwrite refreshes metadata; drop the old entry before budgeting
        table.remove(key);

        if let Some(budget) = self.config.max_memory_bytes {
            let projected = table.usage_bytes + size;
            if projected > budget {
                let target = projected - budget + self.config.eviction_buffer_bytes;
                let (evicted, freed) = table.evict_oldest(target);
                self.metrics.record_evictions(evicted);
                debug!(
                    key = key,
                    evicted = evicted,
                    freed = freed,
                    budget = budget,
                    "Evicted memory cache entries"
                );
            }
        }

        table.insert(key.to_string(), entry);
        self.metrics.record_set();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self.table.lock().remove(key).is_some();
        if deleted {
            self.metrics.record_deletes(1);
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut table = self.table.lock();
        let expired = match table.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(false),
        };

        if expired {
            table.remove(key);
            self.metrics.record_expirations(1);
            return Ok(false);
        }
        Ok(true)
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        let pattern = KeyPattern::new(pattern)?;
        let mut table = self.table.lock();

        let matching: Vec<String> = table
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &matching {
            table.remove(key);
        }

        let count = matching.len() as u64;
        self.metrics.record_deletes(count);
        debug!(pattern = pattern.as_str(), deleted = count, "Invalidated memory cache keys");
        Ok(count)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let (key_count, usage) = {
            let table = self.table.lock();
            (table.entries.len() as u64, table.usage_bytes)
        };
        Ok(self.metrics.snapshot(BackendKind::Memory, key_count, usage))
    }

    async fn clear(&self) -> Result<()> {
        let mut table = self.table.lock();
        table.entries.clear();
        table.usage_bytes = 0;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        let budget = match self.config.max_memory_bytes {
            Some(budget) => budget,
            None => return true,
        };

        let mut table = self.table.lock();
        if table.usage_bytes > budget {
            let overage = table.usage_bytes - budget;
            let (evicted, _) = table.evict_oldest(overage);
            self.metrics.record_evictions(evicted);
        }
        table.usage_bytes <= budget
    }
}

// =============================================================================
// Tests
// =============================================================================
