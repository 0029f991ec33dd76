use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
    response::Json,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use webp_convert_core::ConvertConfig;

mod handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var_os("WEBP_CONVERT_CONFIG") {
        Some(path) => ConvertConfig::from_json_file(std::path::Path::new(&path))
            .context("Failed to load WEBP_CONVERT_CONFIG")?,
        None => ConvertConfig::default(),
    };

    let app = router(Arc::new(config));

    let addr = std::env::var("WEBP_CONVERT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    log::info!("WebP convert server running on http://{}", addr);
    log::info!("API endpoints:");
    log::info!("   POST /convert    - Convert a JPEG/PNG upload to WebP");
    log::info!("   GET  /converters - Converter order");
    log::info!("   GET  /health     - Health check");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn router(config: Arc<ConvertConfig>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/converters", get(handlers::converters))
        .route("/convert", post(handlers::convert))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
