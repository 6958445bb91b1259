//! Remote Backend
//!
//! Delegates to a networked key-value store through a [`KvClient`]. Values
//! are stored as JSON strings under a configurable key prefix; TTLs use the
//! store's native expiry when it has one.

use crate::cache::kv::{KvClient, KvError, RestKvClient};
use crate::cache::metrics::CacheMetrics;
use crate::cache::pattern::KeyPattern;
use crate::cache::{BackendKind, CacheBackend, CacheStats, DEFAULT_TTL_SECONDS};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key written and removed by the round-trip health check
pub const HEALTH_CHECK_KEY: &str = "__health_check__";

// =============================================================================
// Remote Store Configuration
// =============================================================================

/// Configuration for the remote store
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Command endpoint URL
    pub url: Option<String>,
    /// Bearer token
    pub token: Option<String>,
    /// Prefix for all stored keys
    pub key_prefix: String,
    /// TTL applied when a write omits one
    pub default_ttl_seconds: Option<u64>,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            key_prefix: String::new(),
            default_ttl_seconds: Some(DEFAULT_TTL_SECONDS),
        }
    }
}

fn required(value: &Option<String>, what: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Configuration(format!("remote cache {} is not configured", what)))
}

// =============================================================================
// Remote Backend
// =============================================================================

/// Cache backend over a remote key-value store
pub struct RemoteBackend {
    client: Arc<dyn KvClient>,
    key_prefix: String,
    default_ttl_seconds: Option<u64>,
    metrics: CacheMetrics,
}

impl RemoteBackend {
    /// Create a backend over the REST command API.
    ///
    /// Fails with a configuration error if the URL or token is missing.
    pub fn new(config: &RemoteStoreConfig) -> Result<Self> {
        let url = required(&config.url, "URL")?;
        let token = required(&config.token, "token")?;
        let client = RestKvClient::new(url, token)?;
        Ok(Self::with_client(Arc::new(client), config))
    }

    /// Create a backend over any client
    pub fn with_client(client: Arc<dyn KvClient>, config: &RemoteStoreConfig) -> Self {
        Self {
            client,
            key_prefix: config.key_prefix.clone(),
            default_ttl_seconds: config.default_ttl_seconds,
            metrics: CacheMetrics::new(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn err(operation: &str, e: KvError) -> Error {
        Error::backend("remote", operation, e)
    }

    /// All keys under the prefix, with the prefix stripped
    async fn prefixed_keys(&self, operation: &str) -> Result<Vec<String>> {
        let keys = self
            .client
            .keys(&format!("{}*", self.key_prefix))
            .await
            .map_err(|e| Self::err(operation, e))?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.key_prefix).map(str::to_string))
            .collect())
    }

    async fn round_trip_check(&self) -> bool {
        let key = self.full_key(HEALTH_CHECK_KEY);
        let result = async {
            self.client.set(&key, "ok").await?;
            let read = self.client.get(&key).await?;
            self.client.del(&[key.clone()]).await?;
            Ok::<bool, KvError>(read.as_deref() == Some("ok"))
        }
        .await;

        match result {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Remote cache health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl CacheBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw = self
            .client
            .get(&self.full_key(key))
            .await
            .map_err(|e| Self::err("get", e))?;

        match raw {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .map_err(|e| Error::decode("remote", "get", e))?;
                self.metrics.record_hit();
                Ok(Some(value))
            }
            None => {
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<u64>) -> Result<()> {
        let full_key = self.full_key(key);
        let payload = serde_json::to_string(&value)?;

        self.client
            .set(&full_key, &payload)
            .await
            .map_err(|e| Self::err("set", e))?;

        // Value and TTL are two commands; a crash between them leaves the key without expiry
        if let Some(ttl) = ttl_seconds.or(self.default_ttl_seconds) {
            match self.client.expire(&full_key, ttl).await {
                Ok(_) => {}
                Err(KvError::Unsupported(_)) => {
                    debug!(key = key, "Remote store has no expire; key stored without TTL");
                }
                Err(e) => return Err(Self::err("expire", e)),
            }
        }

        self.metrics.record_set();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self
            .client
            .del(&[self.full_key(key)])
            .await
            .map_err(|e| Self::err("delete", e))?;
        self.metrics.record_deletes(removed);
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.client
            .exists(&self.full_key(key))
            .await
            .map_err(|e| Self::err("exists", e))
    }

    async fn mdelete(&self, keys: &[String]) -> Result<u64> {
        let full_keys: Vec<String> = keys.iter().map(|k| self.full_key(k)).collect();
        let removed = self
            .client
            .del(&full_keys)
            .await
            .map_err(|e| Self::err("delete", e))?;
        self.metrics.record_deletes(removed);
        Ok(removed)
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        let pattern = KeyPattern::new(pattern)?;

        let matching: Vec<String> = self
            .prefixed_keys("invalidate")
            .await?
            .into_iter()
            .filter(|k| pattern.matches(k))
            .map(|k| self.full_key(&k))
            .collect();

        let removed = self
            .client
            .del(&matching)
            .await
            .map_err(|e| Self::err("invalidate", e))?;

        self.metrics.record_deletes(removed);
        debug!(pattern = pattern.as_str(), deleted = removed, "Invalidated remote cache keys");
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let key_count = if self.key_prefix.is_empty() {
            self.client
                .dbsize()
                .await
                .map_err(|e| Self::err("stats", e))?
        } else {
            self.prefixed_keys("stats").await?.len() as u64
        };
        Ok(self.metrics.snapshot(BackendKind::Remote, key_count, 0))
    }

    async fn clear(&self) -> Result<()> {
        let keys: Vec<String> = self
            .prefixed_keys("clear")
            .await?
            .iter()
            .map(|k| self.full_key(k))
            .collect();

        self.client
            .del(&keys)
            .await
            .map_err(|e| Self::err("clear", e))?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        match self.client.ping().await {
            Ok(()) => true,
            Err(KvError::Unsupported(_)) => self.round_trip_check().await,
            Err(e) => {
                warn!(error = %e, "Remote cache ping failed");
                false
            }
        }
    }
}
