//! 指标抓取与健康检查
//!
//! - GET /metrics
//! - GET /health

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use mysgw_telemetry::{Registry, encode_text};
use tower_http::trace::TraceLayer;
use tracing::warn;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
}

async fn metrics(State(registry): State<Registry>) -> Response {
    match encode_text(&registry) {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            warn!(target: "mysgw.bridge", error = %err, "metrics_encode_failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
