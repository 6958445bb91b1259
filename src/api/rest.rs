//! REST API Handlers
//!
//! Cache administration and match ingestion/lookup endpoints.
//!
//! ```text
//!   POST /v1/matches ──► cache raw (match:{id}:raw) ──► process ──► MatchStore
//!   GET  /v1/matches/:id ──► MatchStore ──miss──► cached raw ──► process
//! ```

use crate::cache::{CacheKey, CacheService};
use crate::error::{Error, ErrorAction};
use crate::matches::{process_with, GameEvent, Match, MatchStore, RawMatch, ReferenceData, TeamFightTally};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateRequest {
    /// Glob over cache keys (`*` and `?`)
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

/// Processed match plus its derived views
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse<'a> {
    #[serde(rename = "match")]
    pub processed: &'a Match,
    pub team_fights: TeamFightTally,
    pub timeline: Vec<GameEvent>,
}

impl<'a> MatchResponse<'a> {
    pub fn new(processed: &'a Match) -> Self {
        Self {
            processed,
            team_fights: processed.team_fight_tally(),
            timeline: processed.game_events(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiErrorResponse {
    fn respond(status: StatusCode, error: &str, message: String, details: Option<String>) -> Response {
        (
            status,
            Json(Self {
                error: error.into(),
                message,
                details,
            }),
        )
            .into_response()
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidPattern { .. } | Error::ApiValidation(_) => StatusCode::BAD_REQUEST,
        Error::MatchNotFound { .. } => StatusCode::NOT_FOUND,
        Error::Backend { .. } | Error::BackendUnavailable { .. } | Error::Http(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &str, e: &Error) -> Response {
    ApiErrorResponse::respond(status_for(e), error, e.to_string(), None)
}

// =============================================================================
// REST Router
// =============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheService>,
    pub matches: Arc<MatchStore>,
    pub reference: Arc<ReferenceData>,
    /// TTL for cached raw payloads; `None` uses the backend default
    pub raw_ttl_seconds: Option<u64>,
}

impl AppState {
    pub fn new(
        cache: Arc<CacheService>,
        matches: Arc<MatchStore>,
        reference: Arc<ReferenceData>,
    ) -> Self {
        Self {
            cache,
            matches,
            reference,
            raw_ttl_seconds: None,
        }
    }

    pub fn with_raw_ttl(mut self, ttl_seconds: u64) -> Self {
        self.raw_ttl_seconds = Some(ttl_seconds);
        self
    }
}

/// REST API router builder
pub struct RestRouter {
    state: AppState,
    request_timeout: Duration,
    max_body_size: usize,
}

impl RestRouter {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
        }
    }

    pub fn with_limits(mut self, request_timeout: Duration, max_body_size: usize) -> Self {
        self.request_timeout = request_timeout;
        self.max_body_size = max_body_size;
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let layers = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            // Limit sits outside the timeout: Timeout needs a Default response body
            .layer(RequestBodyLimitLayer::new(self.max_body_size))
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(CorsLayer::permissive());

        Router::new()
            // Cache endpoints
            .route("/v1/cache/stats", get(cache_stats))
            .route("/v1/cache/keys/:key", delete(delete_key))
            .route("/v1/cache/invalidate", post(invalidate))
            // Match endpoints
            .route("/v1/matches", post(submit_match))
            .route("/v1/matches/:id", get(get_match))
            // Health endpoints
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .layer(layers)
            .with_state(self.state)
    }
}

// =============================================================================
// Cache Handlers
// =============================================================================

async fn cache_stats(State(state): State<AppState>) -> Response {
    match state.cache.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response("stats_failed", &e),
    }
}

async fn delete_key(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.cache.delete(&key).await {
        Ok(removed) => {
            debug!(key = %key, removed, "Cache key deleted");
            let deleted = u64::from(removed);
            (StatusCode::OK, Json(DeletedResponse { deleted })).into_response()
        }
        Err(e) => error_response("delete_failed", &e),
    }
}

async fn invalidate(
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> Response {
    match state.cache.invalidate_pattern(&request.pattern).await {
        Ok(deleted) => {
            info!(pattern = %request.pattern, deleted, "Cache invalidated");
            (StatusCode::OK, Json(DeletedResponse { deleted })).into_response()
        }
        Err(e) => error_response("invalidate_failed", &e),
    }
}

// =============================================================================
// Match Handlers
// =============================================================================

async fn submit_match(State(state): State<AppState>, Json(raw): Json<RawMatch>) -> Response {
    if raw.match_id == 0 {
        return error_response(
            "invalid_match",
            &Error::ApiValidation("match_id is required".into()),
        );
    }

    let key = CacheKey::match_raw(raw.match_id).to_storage_key();
    if let Err(e) = state.cache.set_json(&key, &raw, state.raw_ttl_seconds).await {
        warn!(match_id = raw.match_id, error = %e, "Failed to cache raw match");
    }

    let processed = state.matches.insert(process_with(&raw, &state.reference));
    info!(match_id = processed.id, winner = %processed.result, "Match processed");

    (StatusCode::CREATED, Json(MatchResponse::new(&processed))).into_response()
}

async fn get_match(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    if let Some(processed) = state.matches.get(id) {
        return (StatusCode::OK, Json(MatchResponse::new(&processed))).into_response();
    }

    let key = CacheKey::match_raw(id).to_storage_key();
    match state.cache.get_json::<RawMatch>(&key).await {
        Ok(Some(raw)) => {
            debug!(match_id = id, "Reprocessing cached raw match");
            let processed = state.matches.insert(process_with(&raw, &state.reference));
            (StatusCode::OK, Json(MatchResponse::new(&processed))).into_response()
        }
        Ok(None) => not_found(&state, id),
        Err(e) => {
            warn!(match_id = id, error = %e, "Cached raw match unusable");
            state.matches.record_error(id, e.to_string());
            match e.action() {
                ErrorAction::TreatAsMiss => not_found(&state, id),
                _ => error_response("cache_unavailable", &e),
            }
        }
    }
}

fn not_found(state: &AppState, id: u64) -> Response {
    let e = Error::MatchNotFound { match_id: id };
    ApiErrorResponse::respond(
        StatusCode::NOT_FOUND,
        "not_found",
        e.to_string(),
        state.matches.last_error(id),
    )
}

// =============================================================================
// Health Handlers
// =============================================================================

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.cache.is_healthy().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "cache backend unhealthy")
    }
}
