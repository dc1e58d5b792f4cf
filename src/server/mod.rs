//! HTTP server exposing the flow invoker.
//!
//! # Endpoints
//!
//! - `GET  /health`       — Liveness probe
//! - `GET  /capabilities` — List registered capabilities
//! - `POST /flows/:name`  — Invoke a capability

pub mod routes;

pub use routes::{app_router, AppState};
