//! Axum route handlers for the lexflow HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`        — `{"status": "ok", "version": .., "service": "lexflow"}`
//! - `GET  /capabilities`  — Registered capabilities with their JSON schemas
//! - `POST /flows/:name`   — Invoke a capability with the request body as input

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::flow::{FlowError, FlowInvoker};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<FlowInvoker>,
    /// Request body limit; scanned documents arrive inline as data URIs.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(invoker: FlowInvoker) -> Self {
        Self {
            invoker: Arc::new(invoker),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/capabilities", get(list_capabilities_handler))
        .route("/flows/:name", post(invoke_flow_handler))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "lexflow",
    }))
}

/// GET /capabilities — registered capabilities, sorted by name.
async fn list_capabilities_handler(State(state): State<AppState>) -> Json<Value> {
    let capabilities: Vec<Value> = state
        .invoker
        .registry()
        .list()
        .into_iter()
        .map(|def| {
            json!({
                "name": def.name,
                "description": def.description,
                "input": def.input.to_json_schema(),
                "output": def.output.to_json_schema(),
            })
        })
        .collect();

    Json(json!({
        "backend": state.invoker.backend_name(),
        "capabilities": capabilities,
    }))
}

/// POST /flows/:name — run one capability.
///
/// The body is the raw input object. Any JSON is accepted here so that
/// shape errors come back from the schema validator, not the extractor.
/// Bodies that are not JSON at all get the same error shape.
async fn invoke_flow_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Json(input) = payload.map_err(rejection_response)?;
    let output = state
        .invoker
        .invoke(&name, &input)
        .await
        .map_err(error_response)?;
    Ok(Json(output.into_value()))
}

fn rejection_response(rejection: JsonRejection) -> (StatusCode, Json<Value>) {
    tracing::info!(status = %rejection.status(), "request body rejected: {}", rejection.body_text());
    (
        rejection.status(),
        Json(json!({
            "error": rejection.body_text(),
            "kind": "validation",
        })),
    )
}

fn status_for(err: &FlowError) -> StatusCode {
    match err {
        FlowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::UnknownCapability { .. } => StatusCode::NOT_FOUND,
        FlowError::Backend { .. } | FlowError::SchemaMismatch(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: FlowError) -> (StatusCode, Json<Value>) {
    let mut body = json!({
        "error": err.to_string(),
        "kind": err.kind(),
    });
    if let Some(field) = err.field() {
        body["field"] = Value::String(field.to_string());
    }
    (status_for(&err), Json(body))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
