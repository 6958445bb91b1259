//! Pluggable Cache Backends
//!
//! A uniform interface over three interchangeable stores, used to keep
//! calls to rate-limited upstream esports APIs down:
//! - **Memory**: in-process map with TTL, access-ordered eviction and an
//!   optional size budget
//! - **File**: one JSON file per key, for local and mock environments
//! - **Remote**: a key-value store reached through a [`kv::KvClient`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            CacheService                                  │
//! │         (selects exactly one backend, falls back to memory)              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────────┐   │
//! │  │    Memory    │  │     File     │  │           Remote             │   │
//! │  │  (IndexMap)  │  │ (JSON/key)   │  │   (KvClient: REST / local)   │   │
//! │  └──────┬───────┘  └──────────────┘  └──────────────────────────────┘   │
//! │         │                                                                │
//! │  ┌──────┴───────┐                                                        │
//! │  │ Expiry sweep │                                                        │
//! │  └──────────────┘                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dotaboard::cache::{CacheBackend, MemoryBackend, MemoryBackendConfig};
//! use serde_json::json;
//!
//! let cache = MemoryBackend::new(MemoryBackendConfig::default());
//! cache.set("team:15:info", json!({"name": "PSG.LGD"}), Some(3600)).await?;
//!
//! if let Some(team) = cache.get("team:15:info").await? {
//!     println!("cached: {}", team);
//! }
//!
//! let removed = cache.invalidate_pattern("team:*:info").await?;
//! ```

pub mod backends;
pub mod cleanup;
pub mod entry;
pub mod keys;
pub mod kv;
pub mod metrics;
pub mod pattern;
pub mod service;

// Re-export main types
pub use backends::{
    FileBackend, FileBackendConfig, MemoryBackend, MemoryBackendConfig, RemoteBackend,
    RemoteStoreConfig,
};
pub use cleanup::{ExpirySweeper, SweeperHandle};
pub use entry::CacheEntry;
pub use keys::CacheKey;
pub use kv::{InProcessKvClient, KvClient, KvError, RestKvClient};
pub use metrics::CacheMetrics;
pub use pattern::KeyPattern;
pub use service::{CacheService, CacheServiceConfig};

use crate::error::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Default TTL applied when a caller omits one: 24 hours
pub const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

// =============================================================================
// Backend Kind
// =============================================================================

/// Which concrete store sits behind a [`CacheBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    File,
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::File => "file",
            BackendKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Point-in-time snapshot of a backend's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub key_count: u64,
    pub memory_usage_bytes: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub uptime_ms: u64,
    pub backend_kind: BackendKind,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
}

// =============================================================================
// Batch Write
// =============================================================================

/// One item of an [`CacheBackend::mset`] batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheWrite {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl CacheWrite {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ttl_seconds: None,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }
}

// =============================================================================
// CacheBackend Trait (Port)
// =============================================================================

/// Contract implemented by every cache store.
///
/// Reads are lenient: a miss or an expired key is `Ok(None)`, never an
/// error. Expired entries are removed when they are read or checked.
/// Writes never fail silently; every backend error carries the backend and
/// operation name.
///
/// The batch operations are independent per-key operations with no
/// atomicity across the batch.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Which store this is
    fn kind(&self) -> BackendKind;

    /// Look up a key, treating expired entries as absent
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value; `None` applies the backend's default TTL.
    ///
    /// Overwriting a key replaces its metadata.
    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) -> Result<()>;

    /// Delete a key, returning true iff it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check for a live key (expired keys report false and are cleaned up)
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Look up several keys; the result is positionally aligned with `keys`
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        try_join_all(keys.iter().map(|key| self.get(key))).await
    }

    /// Store several values
    async fn mset(&self, entries: Vec<CacheWrite>) -> Result<()> {
        try_join_all(
            entries
                .into_iter()
                .map(|entry| async move { self.set(&entry.key, entry.value, entry.ttl_seconds).await }),
        )
        .await?;
        Ok(())
    }

    /// Delete several keys, returning how many existed
    async fn mdelete(&self, keys: &[String]) -> Result<u64> {
        let deleted = try_join_all(keys.iter().map(|key| self.delete(key))).await?;
        Ok(deleted.into_iter().filter(|d| *d).count() as u64)
    }

    /// Delete every key matching a glob (`*`, `?`), returning the count
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64>;

    /// Snapshot current statistics
    async fn stats(&self) -> Result<CacheStats>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Check whether the backend can serve requests
    async fn is_healthy(&self) -> bool;
}

/// Type alias for Arc'd CacheBackend
pub type CacheBackendRef = Arc<dyn CacheBackend>;

// =============================================================================
// Tests
// =============================================================================
