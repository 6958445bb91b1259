//! File Backend
//!
//! One JSON file per key under a cache directory. Each file holds the value
//! and an optional absolute expiry (epoch milliseconds); expiry is checked on
//! read. The directory is created on first write.
//!
//! ```text
//!   key "team:15:info"  ──►  <cache_dir>/team_15_info.json
//!                            {"value": {...}, "expiresAt": 1718000000000}
//! ```
//!
//! Filenames are sanitized, so distinct keys that differ only in replaced
//! characters share a file.

use crate::cache::metrics::CacheMetrics;
use crate::cache::pattern::KeyPattern;
use crate::cache::{BackendKind, CacheBackend, CacheStats};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const FILE_EXTENSION: &str = "json";
const HEALTH_CHECK_FILE: &str = ".health_check";

// =============================================================================
// File Backend Configuration
// =============================================================================

/// Configuration for the file backend
#[derive(Debug, Clone)]
pub struct FileBackendConfig {
    /// Directory holding one file per key
    pub cache_dir: PathBuf,
    /// TTL applied when a write omits one (None = no expiry)
    pub default_ttl_seconds: Option<u64>,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache/dotaboard"),
            default_ttl_seconds: None,
        }
    }
}

impl FileBackendConfig {
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Stored Record
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl StoredRecord {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.map(|at| now_ms >= at).unwrap_or(false)
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Best-effort key recovered from a filename (`_` read back as `:`)
fn key_from_file_name(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".json")?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('_', ":"))
}

// =============================================================================
// File Backend
// =============================================================================

/// File-per-key cache backend
pub struct FileBackend {
    cache_dir: PathBuf,
    default_ttl_seconds: Option<u64>,
    metrics: CacheMetrics,
}

impl FileBackend {
    /// Create new file backend
    pub fn new(config: FileBackendConfig) -> Result<Self> {
        if config.cache_dir.as_os_str().is_empty() {
            return Err(Error::Configuration("file cache directory is empty".to_string()));
        }

        Ok(Self {
            cache_dir: config.cache_dir,
            default_ttl_seconds: config.default_ttl_seconds,
            metrics: CacheMetrics::new(),
        })
    }

    /// Create file backend rooted at `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(FileBackendConfig::with_dir(cache_dir))
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", sanitize_key(key), FILE_EXTENSION))
    }

    async fn ensure_dir(&self, operation: &str) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| Error::backend("file", operation, e))
    }

    /// Read a record; unreadable or corrupt files count as absent
    async fn read_record(&self, path: &Path) -> Option<StoredRecord> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache file");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache file");
                None
            }
        }
    }

    /// Read a live record, deleting it if expired
    async fn read_live(&self, key: &str) -> Option<StoredRecord> {
        let path = self.path_for(key);
        let record = self.read_record(&path).await?;

        if record.is_expired(Utc::now().timestamp_millis()) {
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "Failed to remove expired cache file");
                }
            }
            self.metrics.record_expirations(1);
            return None;
        }

        Some(record)
    }

    /// List cache files with their recovered keys and sizes
    async fn list_files(&self) -> Result<Vec<(PathBuf, String, u64)>> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::backend("file", "list", e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::backend("file", "list", e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = key_from_file_name(&name) else {
                continue;
            };
            let size = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => continue,
            };
            files.push((entry.path(), key, size));
        }

        Ok(files)
    }

    async fn remove(&self, path: &Path, operation: &str) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::backend("file", operation, e)),
        }
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.read_live(key).await {
            Some(record) => {
                self.metrics.record_hit();
                Ok(Some(record.value))
            }
            None => {
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) -> Result<()> {
        self.ensure_dir("set").await?;

        let expires_at = ttl_seconds
            .or(self.default_ttl_seconds)
            .map(|ttl| {
                let ttl_ms = i64::try_from(ttl).unwrap_or(i64::MAX).saturating_mul(1000);
                Utc::now().timestamp_millis().saturating_add(ttl_ms)
            });

        let record = StoredRecord { value, expires_at };
        let payload = serde_json::to_vec(&record)?;

        fs::write(self.path_for(key), payload)
            .await
            .map_err(|e| Error::backend("file", "set", e))?;

        self.metrics.record_set();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self.remove(&self.path_for(key), "delete").await?;
        if deleted {
            self.metrics.record_deletes(1);
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read_live(key).await.is_some())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        let pattern = KeyPattern::new(pattern)?;
        let mut deleted = 0u64;

        for (path, key, _) in self.list_files().await? {
            if pattern.matches(&key) && self.remove(&path, "invalidate").await? {
                deleted += 1;
            }
        }

        self.metrics.record_deletes(deleted);
        Ok(deleted)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let files = self.list_files().await?;
        let usage: u64 = files.iter().map(|(_, _, size)| size).sum();
        Ok(self
            .metrics
            .snapshot(BackendKind::File, files.len() as u64, usage))
    }

    async fn clear(&self) -> Result<()> {
        for (path, _, _) in self.list_files().await? {
            self.remove(&path, "clear").await?;
        }
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        if self.ensure_dir("health").await.is_err() {
            return false;
        }

        // Check that the directory is writable
        let marker = self.cache_dir.join(HEALTH_CHECK_FILE);
        match fs::write(&marker, b"ok").await {
            Ok(_) => {
                let _ = fs::remove_file(&marker).await;
                true
            }
            Err(e) => {
                warn!(dir = %self.cache_dir.display(), error = %e, "File cache not writable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_backend() -> (FileBackend, TempDir) {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::with_dir(tmp.path().join("cache")).unwrap();
        (backend, tmp)
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("team:15:info"), "team_15_info");
        assert_eq!(sanitize_key("a/b c.d-e"), "a_b_c.d-e");
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let (backend, _tmp) = test_backend();

        // Directory does not exist until the first write
        assert_eq!(backend.get("team:1:info").await.unwrap(), None);
        assert!(!backend.cache_dir().exists());

        backend.set("team:1:info", json!({"name": "OG"}), None).await.unwrap();
        assert!(backend.path_for("team:1:info").ends_with("team_1_info.json"));

        let value = backend.get("team:1:info").await.unwrap();
        assert_eq!(value, Some(json!({"name": "OG"})));
        assert!(backend.exists("team:1:info").await.unwrap());

        assert!(backend.delete("team:1:info").await.unwrap());
        assert!(!backend.delete("team:1:info").await.unwrap());
        assert!(!backend.exists("team:1:info").await.unwrap());
    }

    #[tokio::test]
    async fn test_externally_removed_file_is_a_miss() {
        let (backend, _tmp) = test_backend();
        backend.set("match:7:raw", json!({"a": 1}), None).await.unwrap();
        assert_eq!(backend.get("match:7:raw").await.unwrap(), Some(json!({"a": 1})));

        std::fs::remove_file(backend.path_for("match:7:raw")).unwrap();

        assert_eq!(backend.get("match:7:raw").await.unwrap(), None);
        assert!(!backend.exists("match:7:raw").await.unwrap());
    }

    #[tokio::test]
    async fn test_huge_ttl_saturates() {
        let (backend, _tmp) = test_backend();
        backend.set("k", json!(1), Some(u64::MAX)).await.unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(backend.path_for("k")).unwrap()).unwrap();
        assert_eq!(raw["expiresAt"].as_i64(), Some(i64::MAX));
        assert_eq!(backend.get("k").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_record_format() {
        let (backend, _tmp) = test_backend();
        backend.set("k", json!(1), Some(60)).await.unwrap();
        backend.set("forever", json!(2), None).await.unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(backend.path_for("k")).unwrap()).unwrap();
        assert_eq!(raw["value"], json!(1));
        assert!(raw["expiresAt"].as_i64().unwrap() > Utc::now().timestamp_millis());

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(backend.path_for("forever")).unwrap())
                .unwrap();
        assert!(raw.get("expiresAt").is_none());
    }

    #[tokio::test]
    async fn test_expired_file_is_deleted_on_read() {
        let (backend, _tmp) = test_backend();
        backend.set("old", json!("v"), Some(0)).await.unwrap();

        assert_eq!(backend.get("old").await.unwrap(), None);
        assert!(!backend.path_for("old").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let (backend, _tmp) = test_backend();
        backend.set("k", json!(1), None).await.unwrap();
        std::fs::write(backend.path_for("k"), b"{not json").unwrap();

        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let tmp = TempDir::new().unwrap();
        {
            let backend = FileBackend::with_dir(tmp.path()).unwrap();
            backend.set("player:9:profile", json!({"mmr": 9000}), None).await.unwrap();
        }

        let backend = FileBackend::with_dir(tmp.path()).unwrap();
        assert_eq!(
            backend.get("player:9:profile").await.unwrap(),
            Some(json!({"mmr": 9000}))
        );
    }

    #[tokio::test]
    async fn test_pattern_invalidation() {
        let (backend, _tmp) = test_backend();
        backend.set("team:1:info", json!(1), None).await.unwrap();
        backend.set("team:2:info", json!(2), None).await.unwrap();
        backend.set("league:1", json!(3), None).await.unwrap();

        assert_eq!(backend.invalidate_pattern("team:*").await.unwrap(), 2);
        assert!(backend.exists("league:1").await.unwrap());

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.key_count, 1);
        assert_eq!(stats.backend_kind, BackendKind::File);
    }

    #[tokio::test]
    async fn test_invalidate_missing_dir() {
        let (backend, _tmp) = test_backend();
        assert_eq!(backend.invalidate_pattern("*").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_and_health() {
        let (backend, _tmp) = test_backend();
        assert!(backend.is_healthy().await);

        backend.set("a", json!(1), None).await.unwrap();
        backend.set("b", json!(2), None).await.unwrap();
        backend.clear().await.unwrap();

        assert_eq!(backend.stats().await.unwrap().key_count, 0);
        // Health check file is not listed as an entry
        assert!(!backend.cache_dir().join(HEALTH_CHECK_FILE).exists());
    }

    #[tokio::test]
    async fn test_write_failure_raises() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"file, not dir").unwrap();

        let backend = FileBackend::with_dir(blocker.join("cache")).unwrap();
        let err = backend.set("k", json!(1), None).await.unwrap_err();
        assert!(matches!(err, Error::Backend { .. }));
        assert!(!backend.is_healthy().await);
    }
}
