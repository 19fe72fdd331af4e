//! Axum HTTP server — wires the full route table (spec §4.6) onto
//! [`AppState`] and serves it.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{deployments, health, internal, stream};
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/deployments", post(deployments::create))
        .route(
            "/v1/deployments/{id}",
            get(deployments::get).delete(deployments::delete),
        )
        .route("/v1/deployments/{id}/stream", get(stream::status))
        .route("/v1/deployments/{id}/logs/stream", get(stream::logs))
        .route(
            "/internal/deployment-ready/{id}",
            post(internal::deployment_ready),
        )
        .route("/internal/logs/{id}", post(internal::logs))
        .route("/internal/cleanup/{id}", post(internal::cleanup))
        .route(
            "/internal/tasks/orchestrate-deployment",
            post(internal::orchestrate_deployment),
        )
        .route("/health", get(health::health))
        .route("/readiness", get(health::ready))
        .route("/metrics", get(health::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind to `0.0.0.0:{port}` and serve until the process exits.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let port = state.config.port;
    let app = build_app(state);
    let addr = format!("0.0.0.0:{port}");
    info!(addr = %addr, "visgate orchestrator starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
}
