//! Cache Keys
//!
//! Keys are derived from request identity (`team:15:info`,
//! `match:7123456789:raw`) so that related keys can be invalidated together.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a cached upstream response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Entity namespace (e.g. "team", "player", "match", "league")
    pub namespace: String,
    /// Entity identifier within the namespace
    pub id: String,
    /// Optional facet of the entity (e.g. "info", "matches", "raw")
    pub facet: Option<String>,
}

impl CacheKey {
    /// Create a key without a facet
    pub fn new(namespace: impl Into<String>, id: impl ToString) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.to_string(),
            facet: None,
        }
    }

    /// Create a key for one facet of an entity
    pub fn with_facet(namespace: impl Into<String>, id: impl ToString, facet: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.to_string(),
            facet: Some(facet.into()),
        }
    }

    pub fn team_info(team_id: u64) -> Self {
        Self::with_facet("team", team_id, "info")
    }

    pub fn team_matches(team_id: u64) -> Self {
        Self::with_facet("team", team_id, "matches")
    }

    pub fn player_profile(account_id: u64) -> Self {
        Self::with_facet("player", account_id, "profile")
    }

    pub fn match_raw(match_id: u64) -> Self {
        Self::with_facet("match", match_id, "raw")
    }

    pub fn league_info(league_id: u64) -> Self {
        Self::with_facet("league", league_id, "info")
    }

    /// Glob matching every key in a namespace
    pub fn namespace_pattern(namespace: &str) -> String {
        format!("{}:*", namespace)
    }

    /// Get a string representation for storage
    pub fn to_storage_key(&self) -> String {
        match &self.facet {
            Some(facet) => format!("{}:{}:{}", self.namespace, self.id, facet),
            None => format!("{}:{}", self.namespace, self.id),
        }
    }

    /// Parse from storage key string
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.splitn(3, ':').collect();
        match parts.as_slice() {
            [namespace, id] if !namespace.is_empty() && !id.is_empty() => Some(Self {
                namespace: (*namespace).to_string(),
                id: (*id).to_string(),
                facet: None,
            }),
            [namespace, id, facet] if !namespace.is_empty() && !id.is_empty() => Some(Self {
                namespace: (*namespace).to_string(),
                id: (*id).to_string(),
                facet: Some((*facet).to_string()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_key())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_storage_key()
    }
}
