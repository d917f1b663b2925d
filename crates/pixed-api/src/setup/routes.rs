//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use pixed_core::constants::MAX_UPLOAD_BYTES;
use pixed_core::Config;

/// Headroom above the ingest cap for multipart framing; the service still
/// enforces the exact byte cap itself.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .route("/v1/images", post(handlers::images::upload_image))
        .route("/v1/images/:id", get(handlers::images::get_image))
        .route("/v1/images/:id", delete(handlers::images::delete_image))
        .route(
            "/v1/images/:id/thumbnail",
            get(handlers::images::get_thumbnail),
        )
        .route("/v1/images/:id/rotate", post(handlers::transform::rotate))
        .route("/v1/images/:id/flip", post(handlers::transform::flip))
        .route("/v1/images/:id/resize", post(handlers::transform::resize))
        .route(
            "/v1/images/:id/compress",
            post(handlers::transform::compress),
        )
        .route("/v1/images/:id/ops", post(handlers::transform::apply_binary))
        .route("/v1/images/:id/undo", post(handlers::revisions::undo))
        .route("/v1/images/:id/history", get(handlers::revisions::history))
        .route("/health", get(handlers::health::health_check))
        // Axum's default extractor limit (2 MB) sits below the ingest cap;
        // raise it and let RequestBodyLimitLayer enforce the hard ceiling.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + BODY_LIMIT_SLACK))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES + BODY_LIMIT_SLACK))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let layer = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };
    Ok(layer)
}
