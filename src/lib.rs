//! Dotaboard - Dota 2 Dashboard Backend
//!
//! Cache layer and match-processing pipeline behind a Dota 2 match
//! dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          REST API (axum)                            │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐      ┌──────────────────────────────┐ │
//! │  │      Match Pipeline      │      │        Cache Service         │ │
//! │  │  raw ─► sides ─► draft   │      │  selection + memory fallback │ │
//! │  │  roles ─► events ─► ...  │      └──────────────┬───────────────┘ │
//! │  └────────────┬─────────────┘                     │                 │
//! │               ▼                    ┌──────────────┴───────────────┐ │
//! │  ┌──────────────────────────┐      │         CacheBackend         │ │
//! │  │        MatchStore        │      │  ┌────────┐┌──────┐┌──────┐ │ │
//! │  │  match + last error      │      │  │ memory ││ file ││remote│ │ │
//! │  └──────────────────────────┘      │  └────────┘└──────┘└──────┘ │ │
//! │                                    └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: Cache backends, key helpers and the cache service
//! - [`matches`]: Raw match types, normalization pipeline, match store
//! - [`api`]: REST API and server lifecycle
//! - [`error`]: Error types and handling

pub mod api;
pub mod cache;
pub mod error;
pub mod matches;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, AppState, RestRouter};

pub use cache::{
    BackendKind, CacheBackend, CacheKey, CacheService, CacheServiceConfig, CacheStats,
    FileBackend, MemoryBackend, RemoteBackend,
};

pub use error::{Error, ErrorAction, Result};

pub use matches::{process_match_data, process_with, Match, MatchStore, RawMatch, ReferenceData};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
