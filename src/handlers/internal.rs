//! Worker-facing internal endpoints (spec §4.6) — secret-guarded, never
//! exposed to end users.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::models::{CleanupRequest, LogLevel, WorkerCallback};
use crate::orchestrator;
use crate::state::AppState;
use crate::store::DeploymentStore;

const SECRET_HEADER: &str = "x-visgate-internal-secret";

#[derive(Debug, Deserialize)]
pub struct SecretQuery {
    secret: Option<String>,
}

fn check_secret(state: &AppState, headers: &HeaderMap, query: &SecretQuery) -> Result<(), OrchestratorError> {
    let header_secret = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    let provided = header_secret.or(query.secret.as_deref());
    match provided {
        Some(s) if s == state.config.internal_secret => Ok(()),
        _ => Err(OrchestratorError::Unauthorized),
    }
}

/// `POST /internal/deployment-ready/{id}` — worker lifecycle callback.
pub async fn deployment_ready(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
    Json(callback): Json<WorkerCallback>,
) -> OrchestratorResult<StatusCode> {
    check_secret(&state, &headers, &query)?;
    orchestrator::handle_worker_callback(&state, &id, callback).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /internal/logs/{id}` — live log tunnel from the worker.
pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
    Json(body): Json<Value>,
) -> OrchestratorResult<StatusCode> {
    check_secret(&state, &headers, &query)?;

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let level = match body.get("level").and_then(Value::as_str) {
        Some("warn") => LogLevel::Warn,
        Some("error") => LogLevel::Error,
        _ => LogLevel::Info,
    };

    state.logs.push(
        &id,
        crate::models::LogLine {
            timestamp: chrono::Utc::now(),
            level,
            message: crate::redact::redact(&message),
        },
    );
    let _ = state.store.append_log(&id, level, message).await;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /internal/cleanup/{id}` — worker-initiated teardown (idle/failure).
pub async fn cleanup(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
    Json(req): Json<CleanupRequest>,
) -> OrchestratorResult<StatusCode> {
    check_secret(&state, &headers, &query)?;
    orchestrator::handle_cleanup(&state, &id, req.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /internal/tasks/orchestrate-deployment` — task-queue trampoline.
///
/// Stand-in for a durable Cloud-Tasks-equivalent dispatch target (see
/// DESIGN.md); this build enqueues the workflow directly with `tokio::spawn`
/// at creation time, so this route exists for interface completeness and
/// accepts re-delivery of an already-dispatched task as a no-op.
pub async fn orchestrate_deployment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
) -> OrchestratorResult<Json<Value>> {
    check_secret(&state, &headers, &query)?;
    Ok(Json(json!({ "accepted": true })))
}
