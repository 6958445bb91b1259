//! Cache Service
//!
//! Selects exactly one backend from configuration and adds typed helpers on
//! top of it. Selection order:
//!
//! ```text
//!   use_remote ──► remote constructible and healthy? ──► Remote
//!       │                     │ no
//!       │                     ▼
//!       │            fallback_to_memory ? Memory : error
//!       ▼
//!   use_file ──► File
//!       ▼
//!     Memory (with expiry sweep)
//! ```

use crate::cache::backends::{
    FileBackend, FileBackendConfig, MemoryBackend, MemoryBackendConfig, RemoteBackend,
    RemoteStoreConfig,
};
use crate::cache::cleanup::SweeperHandle;
use crate::cache::{BackendKind, CacheBackend, CacheBackendRef, CacheStats, CacheWrite};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

// =============================================================================
// Service Configuration
// =============================================================================

/// Backend selection and per-backend settings
#[derive(Debug, Clone)]
pub struct CacheServiceConfig {
    /// Prefer the remote store
    pub use_remote: bool,
    /// Use the memory backend when the remote store cannot be used
    pub fallback_to_memory: bool,
    pub remote: RemoteStoreConfig,
    /// Use the file backend (ignored when the remote store is selected)
    pub use_file: bool,
    pub file: FileBackendConfig,
    pub memory: MemoryBackendConfig,
}

impl Default for CacheServiceConfig {
    fn default() -> Self {
        Self {
            use_remote: false,
            fallback_to_memory: true,
            remote: RemoteStoreConfig::default(),
            use_file: false,
            file: FileBackendConfig::default(),
            memory: MemoryBackendConfig::default(),
        }
    }
}

// =============================================================================
// Cache Service
// =============================================================================

/// Facade over the selected backend
pub struct CacheService {
    backend: CacheBackendRef,
    sweeper: Option<SweeperHandle>,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("kind", &self.kind())
            .field("sweeper", &self.has_sweeper())
            .finish_non_exhaustive()
    }
}

impl CacheService {
    /// Select and construct the backend described by `config`
    pub async fn from_config(config: CacheServiceConfig) -> Result<Self> {
        if config.use_remote {
            return Self::remote_or_fallback(config).await;
        }

        if config.use_file {
            let backend = FileBackend::new(config.file)?;
            info!(dir = %backend.cache_dir().display(), "Using file cache backend");
            return Ok(Self::with_backend(Arc::new(backend)));
        }

        info!("Using memory cache backend");
        Ok(Self::memory(config.memory))
    }

    async fn remote_or_fallback(config: CacheServiceConfig) -> Result<Self> {
        let failure = match RemoteBackend::new(&config.remote) {
            Ok(remote) => {
                if remote.is_healthy().await {
                    info!("Using remote cache backend");
                    return Ok(Self::with_backend(Arc::new(remote)));
                }
                Error::BackendUnavailable {
                    backend: BackendKind::Remote.to_string(),
                }
            }
            Err(e) => e,
        };

        if !config.fallback_to_memory {
            return Err(failure);
        }

        warn!(error = %failure, "Remote cache unusable, falling back to memory");
        Ok(Self::memory(config.memory))
    }

    /// Memory backend with its expiry sweep.
    ///
    /// The sweep only starts when called inside a Tokio runtime.
    pub fn memory(config: MemoryBackendConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new(config));
        let sweeper = backend.start_sweeper();
        Self {
            backend,
            sweeper,
        }
    }

    /// Wrap an already-constructed backend
    pub fn with_backend(backend: CacheBackendRef) -> Self {
        Self {
            backend,
            sweeper: None,
        }
    }

    /// Get the active backend
    pub fn backend(&self) -> &CacheBackendRef {
        &self.backend
    }

    /// Which kind of backend is active
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Whether a background expiry sweep is running
    pub fn has_sweeper(&self) -> bool {
        self.sweeper.as_ref().map(|s| s.is_running()).unwrap_or(false)
    }

    /// Stop background work
    pub async fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop().await;
        }
    }

    // =========================================================================
    // Delegated Operations
    // =========================================================================

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) -> Result<()> {
        self.backend.set(key, value, ttl_seconds).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.backend.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    pub async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        self.backend.mget(keys).await
    }

    pub async fn mset(&self, entries: Vec<CacheWrite>) -> Result<()> {
        self.backend.mset(entries).await
    }

    pub async fn mdelete(&self, keys: &[String]) -> Result<u64> {
        self.backend.mdelete(keys).await
    }

    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        self.backend.invalidate_pattern(pattern).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        self.backend.stats().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn is_healthy(&self) -> bool {
        self.backend.is_healthy().await
    }

    // =========================================================================
    // Typed Helpers
    // =========================================================================

    /// Read and deserialize a value
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a value
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.backend.set(key, value, ttl_seconds).await
    }

    /// Return the cached value or fetch, store and return a fresh one.
    ///
    /// Cache failures are logged and treated as misses; only `fetch`
    /// errors reach the caller.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: Option<u64>,
        fetch: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(key = key, action = ?e.action(), error = %e, "Cache read failed"),
        }

        let fresh = fetch().await?;

        if let Err(e) = self.set_json(key, &fresh, ttl_seconds).await {
            warn!(key = key, action = ?e.action(), error = %e, "Cache write failed");
        }

        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::kv::InProcessKvClient;
    use crate::cache::KvClient;
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn memory_config() -> CacheServiceConfig {
        CacheServiceConfig {
            memory: MemoryBackendConfig::for_tests(),
            ..Default::default()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Team {
        id: u64,
        name: String,
    }

    #[tokio::test]
    async fn test_defaults_to_memory() {
        let service = CacheService::from_config(memory_config()).await.unwrap();
        assert_eq!(service.kind(), BackendKind::Memory);
        assert!(!service.has_sweeper());
        assert!(format!("{service:?}").contains("Memory"));
    }

    #[test]
    fn test_memory_outside_runtime_skips_sweeper() {
        let service = CacheService::memory(MemoryBackendConfig::default());
        assert_eq!(service.kind(), BackendKind::Memory);
        assert!(!service.has_sweeper());
    }

    #[tokio::test]
    async fn test_memory_starts_sweeper_outside_test_mode() {
        let mut service = CacheService::from_config(CacheServiceConfig::default())
            .await
            .unwrap();
        assert!(service.has_sweeper());
        service.shutdown().await;
        assert!(!service.has_sweeper());
    }

    #[tokio::test]
    async fn test_selects_file_backend() {
        let tmp = TempDir::new().unwrap();
        let config = CacheServiceConfig {
            use_file: true,
            file: FileBackendConfig::with_dir(tmp.path()),
            ..memory_config()
        };
        let service = CacheService::from_config(config).await.unwrap();
        assert_eq!(service.kind(), BackendKind::File);
    }

    #[tokio::test]
    async fn test_unconfigured_remote_falls_back_to_memory() {
        let config = CacheServiceConfig {
            use_remote: true,
            use_file: true,
            ..memory_config()
        };
        let service = CacheService::from_config(config).await.unwrap();
        assert_eq!(service.kind(), BackendKind::Memory);
    }

    #[tokio::test]
    async fn test_unconfigured_remote_without_fallback_fails() {
        let config = CacheServiceConfig {
            use_remote: true,
            fallback_to_memory: false,
            ..memory_config()
        };
        let result = CacheService::from_config(config).await;
        assert_matches!(result, Err(Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back() {
        // Nothing listens on port 9; the ping fails
        let config = CacheServiceConfig {
            use_remote: true,
            remote: RemoteStoreConfig {
                url: Some("http://127.0.0.1:9".into()),
                token: Some("secret".into()),
                ..Default::default()
            },
            ..memory_config()
        };
        let service = CacheService::from_config(config).await.unwrap();
        assert_eq!(service.kind(), BackendKind::Memory);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let service = CacheService::from_config(memory_config()).await.unwrap();
        let team = Team {
            id: 15,
            name: "PSG.LGD".into(),
        };

        service.set_json("team:15:info", &team, None).await.unwrap();
        let cached: Option<Team> = service.get_json("team:15:info").await.unwrap();
        assert_eq!(cached, Some(team));

        service.set("team:16:info", json!("not a team"), None).await.unwrap();
        let err = service.get_json::<Team>("team:16:info").await.unwrap_err();
        assert_matches!(err, Error::JsonParse(_));
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches() {
        let service = CacheService::from_config(memory_config()).await.unwrap();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let team: Team = service
                .get_or_fetch("team:2:info", Some(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Team {
                        id: 2,
                        name: "Team Secret".into(),
                    })
                })
                .await
                .unwrap();
            assert_eq!(team.id, 2);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_survives_broken_backend() {
        let client = Arc::new(InProcessKvClient::new());
        let backend = RemoteBackend::with_client(client.clone(), &RemoteStoreConfig::default());
        let service = CacheService::with_backend(Arc::new(backend));
        client.set_available(false);

        let team: Team = service
            .get_or_fetch("team:3:info", None, || async {
                Ok(Team {
                    id: 3,
                    name: "Tundra".into(),
                })
            })
            .await
            .unwrap();
        assert_eq!(team.name, "Tundra");

        client.set_available(true);
        assert!(client.is_empty());
        assert_eq!(client.keys("*").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_get_or_fetch_propagates_fetch_error() {
        let service = CacheService::from_config(memory_config()).await.unwrap();
        let result: Result<Team> = service
            .get_or_fetch("team:4:info", None, || async {
                Err(Error::Internal("upstream down".into()))
            })
            .await;
        assert_matches!(result, Err(Error::Internal(_)));
        assert!(!service.exists("team:4:info").await.unwrap());
    }
}
