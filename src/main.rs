mod config;
mod errors;
mod gemini;
mod models;
mod readings;
mod routes;
mod temp_store;
mod validation;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::AppConfig,
    gemini::{GeminiClient, API_KEY_VAR},
    readings::{InMemoryReadingLog, NeverRecorded, ReadingRepository},
    routes::{router, AppState},
    temp_store::TempImageStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cfg = AppConfig::from_env()?;

    let gemini = GeminiClient::from_env_key(API_KEY_VAR, &cfg.gemini_api_base, &cfg.gemini_model);
    if !gemini.has_api_key() {
        tracing::warn!("⚠️ {} is not set; uploads will fail until it is configured", API_KEY_VAR);
    }

    let readings: Arc<dyn ReadingRepository> = if cfg.duplicate_check {
        Arc::new(InMemoryReadingLog::new())
    } else {
        tracing::info!("Duplicate reading check disabled");
        Arc::new(NeverRecorded)
    };

    let state = AppState {
        images: Arc::new(TempImageStore::new(&cfg.public_base_url, cfg.temp_image_capacity, cfg.temp_image_ttl)),
        readings,
        extractor: Arc::new(gemini),
        expose_error_details: cfg.expose_error_details,
    };

    let app = router(state);

    let addr = cfg.addr();
    tracing::info!(%addr, model = %cfg.gemini_model, "Starting server on {}", cfg.public_base_url);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
