//! Processed match store
//!
//! Processed matches keyed by match id. The last processing or fetch error
//! for an id lives in the same slot as the match, so there is one key space
//! for both.

use crate::matches::model::Match;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct MatchSlot {
    processed: Option<Arc<Match>>,
    last_error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Concurrent keyed store for processed matches
#[derive(Debug, Default)]
pub struct MatchStore {
    slots: DashMap<u64, MatchSlot>,
}

impl MatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a processed match, clearing any recorded error
    pub fn insert(&self, processed: Match) -> Arc<Match> {
        let processed = Arc::new(processed);
        self.slots.insert(
            processed.id,
            MatchSlot {
                processed: Some(processed.clone()),
                last_error: None,
                updated_at: Some(Utc::now()),
            },
        );
        processed
    }

    pub fn get(&self, match_id: u64) -> Option<Arc<Match>> {
        self.slots.get(&match_id).and_then(|slot| slot.processed.clone())
    }

    /// Record a failure for `match_id`, keeping any previously stored match
    pub fn record_error(&self, match_id: u64, error: impl Into<String>) {
        let mut slot = self.slots.entry(match_id).or_default();
        slot.last_error = Some(error.into());
        slot.updated_at = Some(Utc::now());
    }

    pub fn last_error(&self, match_id: u64) -> Option<String> {
        self.slots.get(&match_id).and_then(|slot| slot.last_error.clone())
    }

    /// When the slot for `match_id` last changed
    pub fn updated_at(&self, match_id: u64) -> Option<DateTime<Utc>> {
        self.slots.get(&match_id).and_then(|slot| slot.updated_at)
    }

    /// Drop the match and its error
    pub fn invalidate(&self, match_id: u64) -> bool {
        self.slots.remove(&match_id).is_some()
    }

    /// Number of stored matches (error-only slots excluded)
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.processed.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
