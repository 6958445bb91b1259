//! Key-Value Store Clients
//!
//! The remote backend talks to its store through [`KvClient`], a narrow
//! command-level port:
//!
//! ```text
//!   RemoteBackend ──► KvClient ──┬── RestKvClient     (HTTP command API)
//!                                └── InProcessKvClient (dashmap, for tests
//!                                                       and local runs)
//! ```
//!
//! `expire` and `ping` are optional capabilities; clients that lack them
//! return [`KvError::Unsupported`].

use crate::cache::entry::expiry_after;
use crate::cache::pattern::KeyPattern;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Client Errors
// =============================================================================

/// Errors raised by a key-value client
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KvError {
    #[error("{0} is not supported by this store")]
    Unsupported(&'static str),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("store rejected command: {0}")]
    Store(String),

    #[error("unexpected response: {0}")]
    Protocol(String),
}

pub type KvResult<T> = std::result::Result<T, KvError>;

// =============================================================================
// Client Port
// =============================================================================

/// Command-level access to a string key-value store
#[async_trait]
pub trait KvClient: Send + Sync {
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Delete keys, returning how many existed
    async fn del(&self, keys: &[String]) -> KvResult<u64>;

    async fn exists(&self, key: &str) -> KvResult<bool>;

    /// List keys matching a store-side glob
    async fn keys(&self, pattern: &str) -> KvResult<Vec<String>>;

    /// Number of keys in the store
    async fn dbsize(&self) -> KvResult<u64>;

    /// Attach a TTL to an existing key
    async fn expire(&self, _key: &str, _ttl_seconds: u64) -> KvResult<bool> {
        Err(KvError::Unsupported("expire"))
    }

    async fn ping(&self) -> KvResult<()> {
        Err(KvError::Unsupported("ping"))
    }
}

// =============================================================================
// REST Client
// =============================================================================

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for stores exposing commands over HTTP.
///
/// Each command is POSTed as a JSON array (`["SET","k","v"]`) with a bearer
/// token; the store answers `{"result": ...}` or `{"error": "..."}`.
pub struct RestKvClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl fmt::Debug for RestKvClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestKvClient")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RestKvClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let token = token.into();

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Configuration(format!(
                "remote cache URL must be http(s): {}",
                url
            )));
        }
        if token.trim().is_empty() {
            return Err(Error::Configuration("remote cache token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("dotaboard/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self { http, url, token })
    }

    /// Get the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn command(&self, args: Value) -> KvResult<Value> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| KvError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KvError::Transport(e.to_string()))?;

        let parsed: CommandResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(KvError::Store(format!("HTTP {}", status.as_u16())));
            }
            Err(e) => return Err(KvError::Protocol(e.to_string())),
        };

        if let Some(error) = parsed.error {
            return Err(KvError::Store(error));
        }
        if !status.is_success() {
            return Err(KvError::Store(format!("HTTP {}", status.as_u16())));
        }

        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

fn as_count(value: &Value, command: &str) -> KvResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| KvError::Protocol(format!("{} returned {}", command, value)))
}

#[async_trait]
impl KvClient for RestKvClient {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(KvError::Protocol(format!("GET returned {}", other))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.command(json!(["SET", key, value])).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args = vec![Value::from("DEL")];
        args.extend(keys.iter().map(|k| Value::from(k.as_str())));
        let result = self.command(Value::Array(args)).await?;
        as_count(&result, "DEL")
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let result = self.command(json!(["EXISTS", key])).await?;
        Ok(as_count(&result, "EXISTS")? > 0)
    }

    async fn keys(&self, pattern: &str) -> KvResult<Vec<String>> {
        match self.command(json!(["KEYS", pattern])).await? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()),
            other => Err(KvError::Protocol(format!("KEYS returned {}", other))),
        }
    }

    async fn dbsize(&self) -> KvResult<u64> {
        let result = self.command(json!(["DBSIZE"])).await?;
        as_count(&result, "DBSIZE")
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> KvResult<bool> {
        let result = self.command(json!(["EXPIRE", key, ttl_seconds])).await?;
        Ok(as_count(&result, "EXPIRE")? == 1)
    }

    async fn ping(&self) -> KvResult<()> {
        match self.command(json!(["PING"])).await? {
            Value::String(s) if s.eq_ignore_ascii_case("pong") => Ok(()),
            other => Err(KvError::Protocol(format!("PING returned {}", other))),
        }
    }
}

// =============================================================================
// In-Process Client
// =============================================================================

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now < at).unwrap_or(true)
    }
}

/// In-process store with the same command surface as a remote one
pub struct InProcessKvClient {
    entries: DashMap<String, StoredValue>,
    supports_expire: bool,
    supports_ping: bool,
    available: AtomicBool,
}

impl Default for InProcessKvClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessKvClient {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            supports_expire: true,
            supports_ping: true,
            available: AtomicBool::new(true),
        }
    }

    /// Behave like a store without native TTLs
    pub fn without_expire(mut self) -> Self {
        self.supports_expire = false;
        self
    }

    /// Behave like a store without a ping command
    pub fn without_ping(mut self) -> Self {
        self.supports_ping = false;
        self
    }

    /// Simulate the store going away (for testing)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Remaining TTL of a key, if one is set
    pub fn ttl_of(&self, key: &str) -> Option<i64> {
        self.entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| (at - Utc::now()).num_seconds())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_available(&self) -> KvResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KvError::Transport("store unavailable".to_string()))
        }
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Utc::now();
        let live = self.entries.get(key).map(|e| (e.is_live(now), e.value.clone()));
        match live {
            Some((true, value)) => Some(value),
            Some((false, _)) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KvClient for InProcessKvClient {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.check_available()?;
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.check_available()?;
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> KvResult<u64> {
        self.check_available()?;
        let removed = keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        self.check_available()?;
        Ok(self.live_value(key).is_some())
    }

    async fn keys(&self, pattern: &str) -> KvResult<Vec<String>> {
        self.check_available()?;
        let pattern = KeyPattern::new(pattern).map_err(|e| KvError::Store(e.to_string()))?;
        let now = Utc::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_live(now) && pattern.matches(e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn dbsize(&self) -> KvResult<u64> {
        self.check_available()?;
        let now = Utc::now();
        Ok(self.entries.iter().filter(|e| e.value().is_live(now)).count() as u64)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> KvResult<bool> {
        if !self.supports_expire {
            return Err(KvError::Unsupported("expire"));
        }
        self.check_available()?;
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(expiry_after(Utc::now(), ttl_seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> KvResult<()> {
        if !self.supports_ping {
            return Err(KvError::Unsupported("ping"));
        }
        self.check_available()
    }
}
