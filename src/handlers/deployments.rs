//! `POST|GET|DELETE /v1/deployments[/{id}]` (spec §4.6).

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::net::SocketAddr;

use crate::auth::{extract_bearer, user_hash};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::models::{CreateDeploymentRequest, CreateDeploymentResponse, DeploymentView};
use crate::orchestrator;
use crate::state::AppState;
use crate::store::DeploymentStore;

fn check_rate_limits(
    state: &AppState,
    user_hash: &str,
    addr: Option<SocketAddr>,
) -> Result<(), OrchestratorError> {
    if !state.rate_limit_user.check(user_hash) {
        return Err(OrchestratorError::RateLimited {
            retry_after_seconds: state.rate_limit_user.retry_after_seconds(user_hash),
        });
    }
    if let Some(addr) = addr {
        let ip = addr.ip().to_string();
        if !state.rate_limit_ip.check(&ip) {
            return Err(OrchestratorError::RateLimited {
                retry_after_seconds: state.rate_limit_ip.retry_after_seconds(&ip),
            });
        }
    }
    Ok(())
}

/// `POST /v1/deployments`.
pub async fn create(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CreateDeploymentRequest>,
) -> OrchestratorResult<(StatusCode, Json<CreateDeploymentResponse>)> {
    let bearer = extract_bearer(&headers)?;
    let hash = user_hash(bearer);
    check_rate_limits(&state, &hash, Some(addr))?;

    let response = orchestrator::create_deployment(&state, req, bearer, hash).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// `GET /v1/deployments/{id}`. A tenancy mismatch is indistinguishable from
/// a missing record — both return `DeploymentNotFound` (spec §3 invariant 5).
pub async fn get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> OrchestratorResult<Json<DeploymentView>> {
    let bearer = extract_bearer(&headers)?;
    let hash = user_hash(bearer);

    let deployment = state
        .store
        .get(&id)
        .await
        .filter(|d| d.user_hash == hash)
        .ok_or(OrchestratorError::DeploymentNotFound)?;

    Ok(Json(DeploymentView {
        deployment_id: deployment.deployment_id,
        status: deployment.status.to_string(),
        hf_model_id: deployment.hf_model_id,
        gpu_tier: deployment.gpu_tier,
        region: deployment.region,
        runpod_endpoint_id: deployment.runpod_endpoint_id,
        endpoint_url: deployment.endpoint_url,
        gpu_allocated: deployment.gpu_allocated,
        model_vram_gb: deployment.model_vram_gb,
        error: deployment.error,
        created_at: deployment.created_at.to_rfc3339(),
        ready_at: deployment.ready_at.map(|t| t.to_rfc3339()),
    }))
}

/// `DELETE /v1/deployments/{id}`.
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> OrchestratorResult<axum::http::StatusCode> {
    let bearer = extract_bearer(&headers)?;
    let hash = user_hash(bearer);

    let deployment = state
        .store
        .get(&id)
        .await
        .filter(|d| d.user_hash == hash)
        .ok_or(OrchestratorError::DeploymentNotFound)?;

    orchestrator::delete_deployment(&state, &deployment.deployment_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
