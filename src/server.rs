//! HTTP API.
//!
//! A thin JSON front end over [`Engine::tag`], with optional result caching.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/taggers` | Registered tagger names |
//! | `GET`  | `/tag?footprint=…&timestamp=…&taggers=LandCover,Political` | Tag with default options |
//! | `POST` | `/tag` | Tag with per-tagger options (body below) |
//!
//! ```json
//! {
//!   "footprint": "POLYGON((…))",
//!   "timestamp": "2020-01-01T00:00:00Z",
//!   "taggers": [{ "name": "LandCover" }, { "name": "Political", "options": { "toponyms": false } }]
//! }
//! ```
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_geometry", "message": "…" } }
//! ```
//!
//! Codes: `missing_footprint`, `invalid_geometry`, `bad_request` (400),
//! `database_error` (500). Bodies and query strings that fail to parse are
//! `bad_request`.
//!
//! Results are cached only when every resolved tagger contributed.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::cache::{request_key, ResultCache};
use crate::config::{Config, EngineConfig};
use crate::engine::Engine;
use crate::error::TagError;
use crate::models::{FootprintMetadata, ProviderRequest, TagResult};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
    cache: Arc<ResultCache>,
}

/// Connects the engine and serves the API on `[server].bind` until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Engine::connect(&config.database, EngineConfig::from(config)).await?;
    let cache = ResultCache::new(config.cache.dir.as_deref());
    let app = router(Arc::new(engine), cache);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "geotagger listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the API router around an engine and a cache.
pub fn router(engine: Arc<Engine>, cache: ResultCache) -> Router {
    let state = AppState {
        engine,
        cache: Arc::new(cache),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/taggers", get(handle_list_taggers))
        .route("/tag", get(handle_tag_query).post(handle_tag_body))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<TagError> for AppError {
    fn from(err: TagError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /taggers ============

#[derive(Serialize)]
struct TaggerListResponse {
    taggers: Vec<String>,
}

async fn handle_list_taggers(State(state): State<AppState>) -> Json<TaggerListResponse> {
    let taggers = state
        .engine
        .registry()
        .names()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(TaggerListResponse { taggers })
}

// ============ /tag ============

#[derive(Debug, Deserialize)]
struct TagQuery {
    footprint: Option<String>,
    timestamp: Option<String>,
    /// Comma-separated tagger names, in merge order.
    taggers: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagBody {
    footprint: Option<String>,
    timestamp: Option<String>,
    #[serde(default)]
    taggers: ProviderRequest,
}

async fn handle_tag_query(
    State(state): State<AppState>,
    query: Result<Query<TagQuery>, QueryRejection>,
) -> Result<Json<TagResult>, AppError> {
    let Query(query) = query.map_err(|rejection| bad_request(rejection.body_text()))?;
    let request: ProviderRequest = query
        .taggers
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    let metadata = FootprintMetadata {
        footprint: query.footprint,
        timestamp: query.timestamp,
        area: None,
    };
    run_tag(&state, metadata, request).await
}

async fn handle_tag_body(
    State(state): State<AppState>,
    body: Result<Json<TagBody>, JsonRejection>,
) -> Result<Json<TagResult>, AppError> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let metadata = FootprintMetadata {
        footprint: body.footprint,
        timestamp: body.timestamp,
        area: None,
    };
    run_tag(&state, metadata, body.taggers).await
}

async fn run_tag(
    state: &AppState,
    metadata: FootprintMetadata,
    request: ProviderRequest,
) -> Result<Json<TagResult>, AppError> {
    if let Some(ts) = metadata.timestamp.as_deref() {
        chrono::DateTime::parse_from_rfc3339(ts)
            .map_err(|e| bad_request(format!("invalid timestamp '{}': {}", ts, e)))?;
    }

    let key = request_key(&metadata, &request);
    match state.cache.read::<TagResult>(&key) {
        Ok(Some(cached)) => {
            debug!(key = %key, "cache hit");
            return Ok(Json(cached));
        }
        Ok(None) => {}
        Err(e) => warn!(key = %key, error = %e, "ignoring unreadable cache entry"),
    }

    let report = state.engine.tag_with_report(&metadata, &request).await?;

    if !report.is_complete() {
        debug!(key = %key, failed = ?report.failed, "not caching partial result");
    } else if let Err(e) = state.cache.write(&key, &report.result) {
        warn!(key = %key, error = %e, "failed to cache result");
    }
    Ok(Json(report.result))
}
