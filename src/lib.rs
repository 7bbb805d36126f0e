//! Hash-keyed URL shortener.
//!
//! Links are kept in an in-memory [`cache::LookupStore`] that is rebuilt on
//! startup from an append-only JSON-lines log and appended to on every
//! create.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, decompression::RequestDecompressionLayer,
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hasher;
pub mod models;
pub mod service;
pub mod storage;

use config::AppConfig;
use service::ShortenerService;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: AppConfig,
    pub shortener: ShortenerService,
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness probe
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/", post(handlers::shorten::shorten_text))
        .route("/api/shorten", post(handlers::shorten::shorten_json))
        // Short-link redirect; static routes above take priority
        .route("/:key", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
