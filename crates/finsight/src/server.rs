//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | `{ "query" }` → `{ "summary" }` |
//! | `POST` | `/visualize` | `{ "query" }` → chart payload, or `{ "message" }` when nothing matched |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (502, embedding or
//! vector store failure), `model_error` (502, chat model failure).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards
//! can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use finsight_core::chart::ChartOutcome;
use finsight_core::pipeline::{PipelineError, SummaryResponse};

use crate::config::Config;
use crate::seed::SeedState;
use crate::service::AppServices;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    services: Arc<AppServices>,
}

/// Seeds the store (when configured), binds `[server].bind`, and serves
/// until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = AppServices::from_config(config)?;

    let mut seed_state = SeedState::new();
    services.seed(config, &mut seed_state).await?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "finsight listening");
    serve(listener, Arc::new(services)).await
}

/// Serve the API on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    services: Arc<AppServices>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(services)).await?;
    Ok(())
}

pub fn router(services: Arc<AppServices>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/visualize", post(handle_visualize))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { services })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"model_error"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::EmptyQuery => bad_request(message),
            PipelineError::Retrieval(_) => {
                tracing::error!(error = %message, "retrieval failed");
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "upstream_error",
                    message,
                }
            }
            PipelineError::ChartParameters(_) | PipelineError::Completion(_) => {
                tracing::error!(error = %message, "model call failed");
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "model_error",
                    message,
                }
            }
        }
    }
}

// ============ Handlers ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

fn parse_body(body: Result<Json<QueryRequest>, JsonRejection>) -> Result<String, AppError> {
    body.map(|Json(req)| req.query)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

/// `POST /query`
async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let query = parse_body(body)?;
    let response = state.services.ask(&query).await?;
    Ok(Json(response))
}

/// `POST /visualize`
async fn handle_visualize(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ChartOutcome>, AppError> {
    let query = parse_body(body)?;
    let outcome = state.services.chart(&query).await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

/// `GET /health`
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
