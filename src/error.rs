//! Error types for Dotaboard
//!
//! Provides structured error types for the cache backends, the cache
//! service, the match store, and the REST API.

use thiserror::Error;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Cache Backend Errors
    // =========================================================================
    #[error("{backend} {operation} error: {reason}")]
    Backend {
        backend: String,
        operation: String,
        reason: String,
    },

    #[error("{backend} {operation} error: {reason}")]
    Decode {
        backend: String,
        operation: String,
        reason: String,
    },

    #[error("Backend unavailable: {backend}")]
    BackendUnavailable { backend: String },

    #[error("Invalid key pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // =========================================================================
    // Match Errors
    // =========================================================================
    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: u64 },

    // =========================================================================
    // API Errors
    // =========================================================================
    #[error("API request validation failed: {0}")]
    ApiValidation(String),

    // =========================================================================
    // Parse / Transport Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a caller should do with a failed cache operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Switch to another backend tier, or treat the operation as a miss
    FallBack,
    /// The stored payload is unusable; behave as if the key were absent
    TreatAsMiss,
    /// Misconfiguration or invalid input; surface to the caller
    Fail,
}

impl Error {
    /// Wrap an underlying failure with backend and operation context
    pub fn backend(
        backend: impl Into<String>,
        operation: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::Backend {
            backend: backend.into(),
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// A stored payload that could not be decoded
    pub fn decode(
        backend: impl Into<String>,
        operation: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::Decode {
            backend: backend.into(),
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            Error::Backend { .. }
            | Error::BackendUnavailable { .. }
            | Error::Http(_)
            | Error::Io(_) => ErrorAction::FallBack,

            Error::Decode { .. } | Error::JsonParse(_) => ErrorAction::TreatAsMiss,

            Error::Configuration(_)
            | Error::InvalidPattern { .. }
            | Error::ApiValidation(_)
            | Error::MatchNotFound { .. }
            | Error::Internal(_) => ErrorAction::Fail,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::Fail)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::BackendUnavailable { .. } | Error::Backend { .. }
        )
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
