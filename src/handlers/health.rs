//! Liveness/readiness probes and the Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;
use crate::store::DeploymentStore;

/// `GET /health` — liveness probe, always `200 OK`.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `GET /readiness` — readiness probe; reports whether the deployment store is
/// reachable.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.store.get("__readiness_probe__").await;
    Json(json!({ "status": "ready" }))
}

/// `GET /metrics` — Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
