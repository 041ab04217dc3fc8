//! HTTP trigger server.
//!
//! Exposes seeding over an authenticated JSON API so the content store can be
//! reseeded remotely without shell access to the host.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/seed?collection=<name>` | Run a seed pass (all collections when the parameter is omitted) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "forbidden", "message": "missing or invalid bearer token" } }
//! ```
//!
//! Error codes: `forbidden` (403), `bad_request` (400), `conflict` (409),
//! `timeout` (408), `internal` (500).
//!
//! # Authentication
//!
//! `POST /seed` requires `Authorization: Bearer <token>` matching
//! `[server].token`. An unauthenticated request is rejected before any
//! filesystem or store access. The server refuses to start with an empty
//! token.
//!
//! Seed requests are serialized behind an in-process mutex (on top of the
//! cross-process lock file), so concurrent POSTs queue instead of failing.

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::models::Collection;
use crate::seed;

/// Shared application state passed to route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    /// Serializes seed passes within this process.
    seed_gate: Arc<tokio::sync::Mutex<()>>,
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    if config.server.token.is_empty() {
        anyhow::bail!("server.token must be set to serve the seed endpoint");
    }

    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        seed_gate: Arc::new(tokio::sync::Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/seed", post(handle_seed))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("seed server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"forbidden"`, `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

fn forbidden(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::FORBIDDEN,
        code: "forbidden".to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn timeout_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::REQUEST_TIMEOUT,
        code: "timeout".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps seed pass failures to the most appropriate status. The lock-file
/// message means a competing invocation holds the cross-process guard.
fn classify_seed_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("another seed pass") {
        AppError {
            status: StatusCode::CONFLICT,
            code: "conflict".to_string(),
            message: msg,
        }
    } else if msg.contains("Unknown collection") {
        bad_request(msg)
    } else {
        internal(format!("{:#}", err))
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

// ============ POST /seed ============

#[derive(Deserialize)]
struct SeedQuery {
    collection: Option<String>,
}

#[derive(Serialize)]
struct SeedResponse {
    /// Collection names this pass processed, in seed order.
    seeded: Vec<String>,
}

/// Handler for `POST /seed`.
///
/// Authorizes, validates the optional collection name, then runs the pass
/// under the in-process gate and the configured wall-clock budget. A pass
/// aborted by the budget leaves the ID map at its last flushed state;
/// re-running recovers, since deletion plus recreation is idempotent.
async fn handle_seed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SeedQuery>,
) -> Result<Json<SeedResponse>, AppError> {
    authorize(&state.config, &headers)?;

    if let Some(name) = &query.collection {
        if Collection::parse(name).is_none() {
            return Err(bad_request(format!("Unknown collection: '{}'", name)));
        }
    }

    let _gate = state.seed_gate.lock().await;

    let pass = seed::run_seed(&state.config, query.collection.as_deref(), false);
    let report = match state.config.server.seed_timeout_secs {
        0 => pass.await,
        secs => match tokio::time::timeout(Duration::from_secs(secs), pass).await {
            Ok(result) => result,
            Err(_) => {
                return Err(timeout_error(format!(
                    "seed pass exceeded the {}s budget; last flushed ID map state is kept",
                    secs
                )))
            }
        },
    }
    .map_err(classify_seed_error)?;

    Ok(Json(SeedResponse {
        seeded: report.seeded_names(),
    }))
}

fn authorize(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == config.server.token => Ok(()),
        _ => Err(forbidden("missing or invalid bearer token")),
    }
}
