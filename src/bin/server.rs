//! lexflow HTTP server binary.
//!
//! Loads the built-in legal capabilities (plus any YAML definitions from
//! `LEXFLOW_CAPABILITIES_DIR`), connects the Gemini backend and serves the
//! flow endpoints. See [`lexflow::config`] for the environment variables.
//!
//! # Usage
//!
//! ```bash
//! GOOGLE_API_KEY=... cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;
use lexflow::server::{app_router, AppState};
use lexflow::{CapabilityRegistry, FlowInvoker, GeminiBackend, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lexflow=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let mut registry = CapabilityRegistry::with_builtins()?;
    if let Some(dir) = &config.capabilities_dir {
        let loaded = registry
            .load_directory(dir)
            .with_context(|| format!("loading capabilities from {}", dir.display()))?;
        tracing::info!("Loaded {} extra capability definition(s)", loaded);
    }
    tracing::info!("Capabilities: {}", registry.names().join(", "));

    if config.backend.api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY is not set; every flow will fail with a backend error");
    }
    let backend = GeminiBackend::new(config.backend.clone())?;
    let invoker = FlowInvoker::new(Arc::new(registry), Arc::new(backend));
    let app = app_router(AppState::new(invoker).with_max_body_bytes(config.max_body_bytes));

    tracing::info!("lexflow server starting on {}", config.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health       — liveness probe");
    tracing::info!("  GET  /capabilities — registered capabilities");
    tracing::info!("  POST /flows/:name  — invoke a capability");

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
