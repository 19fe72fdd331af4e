//! The orchestration state machine (spec §4.5) — owns a deployment's
//! progression from `validating` to `ready`/`failed`.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::OrchestratorError;
use crate::models::{
    generate_deployment_id, CacheScope, CreateDeploymentRequest, CreateDeploymentResponse,
    Deployment, DeploymentStatus, LogLevel, Path, WorkerCallback,
};
use crate::provider::{CreateEndpointOptions, ProviderAdapter};
use crate::resolver;
use crate::state::AppState;
use crate::store::secrets::DeploymentSecrets;
use crate::store::{DeploymentPatch, DeploymentStore};

use super::{readiness, warm, webhook};

const WORKER_IMAGE: &str = "visgate/inference-worker:latest";

fn validate_request(req: &CreateDeploymentRequest) -> Result<(), OrchestratorError> {
    if req.user_webhook_url.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "user_webhook_url is required".to_string(),
        ));
    }
    if req.hf_model_id.is_none() && req.model_name.is_none() {
        return Err(OrchestratorError::InvalidRequest(
            "exactly one of hf_model_id or model_name must be set".to_string(),
        ));
    }
    if req.hf_model_id.is_some() && req.model_name.is_some() {
        return Err(OrchestratorError::InvalidRequest(
            "exactly one of hf_model_id or model_name must be set".to_string(),
        ));
    }
    let private_fields_set = req.user_s3_url.is_some()
        || req.user_aws_access_key_id.is_some()
        || req.user_aws_secret_access_key.is_some()
        || req.user_aws_endpoint_url.is_some();
    if private_fields_set && req.cache_scope != CacheScope::Private {
        return Err(OrchestratorError::InvalidRequest(
            "private cache fields require cache_scope=private".to_string(),
        ));
    }
    Ok(())
}

/// `POST /v1/deployments` entry point (spec §4.5 "create request" rows).
pub async fn create_deployment(
    state: &AppState,
    req: CreateDeploymentRequest,
    bearer_token: &str,
    user_hash: String,
) -> Result<CreateDeploymentResponse, OrchestratorError> {
    validate_request(&req)?;

    let hf_model_id = resolver::resolve_model_id(
        req.hf_model_id.as_deref(),
        req.model_name.as_deref(),
        req.provider.as_deref(),
    )?;

    let provider_name = "runpod".to_string();
    let provider = state
        .provider(&provider_name)
        .ok_or_else(|| OrchestratorError::Internal(format!("unknown provider '{provider_name}'")))?;

    let api_key = req
        .user_runpod_key
        .clone()
        .ok_or_else(|| OrchestratorError::InvalidRequest("user_runpod_key is required".to_string()))?;

    let deployment_id = generate_deployment_id();
    let created_at = Utc::now();
    let endpoint_name = format!(
        "visgate-{}-{}",
        crate::auth::user_hash_prefix10(bearer_token),
        warm::slug(&hf_model_id)
    );

    // Warm-reuse short-circuit (spec §4.5).
    let warm_match = warm::find_warm_endpoint(provider.as_ref(), &api_key, bearer_token, &hf_model_id).await?;

    if let Some(endpoint) = warm_match {
        let endpoint_url = Deployment::normalize_endpoint_url(&endpoint.url);
        let mut deployment = Deployment {
            deployment_id: deployment_id.clone(),
            status: DeploymentStatus::Ready,
            hf_model_id: hf_model_id.clone(),
            user_webhook_url: req.user_webhook_url.clone(),
            gpu_tier: req.gpu_tier.clone(),
            region: req.region.clone(),
            runpod_endpoint_id: Some(endpoint.id.clone()),
            endpoint_url: Some(endpoint_url.clone()),
            gpu_allocated: None,
            model_vram_gb: None,
            logs: Vec::new(),
            error: None,
            created_at,
            ready_at: None,
            user_hash: user_hash.clone(),
            provider: provider_name.clone(),
            endpoint_name: endpoint.name.clone(),
            pool_policy: "on-demand".to_string(),
        };
        deployment.ready_at = Some(created_at);
        state.store.set(deployment).await;

        // mark_ready_and_notify still runs the full path (log line,
        // histogram sample, webhook delivery) even though the record was
        // created already-ready — it is idempotent by construction.
        mark_ready_and_notify(state, &deployment_id, Some(endpoint_url.clone())).await;

        info!(deployment_id = %deployment_id, model_id = %hf_model_id, "warm endpoint reused");

        return Ok(CreateDeploymentResponse {
            deployment_id: deployment_id.clone(),
            status: "warm_ready".to_string(),
            model_id: hf_model_id,
            estimated_ready_seconds: 0,
            estimated_ready_at: created_at.to_rfc3339(),
            poll_interval_seconds: 2,
            stream_url: format!("/v1/deployments/{deployment_id}/stream"),
            webhook_url: req.user_webhook_url.clone(),
            endpoint_url: Some(endpoint_url),
            path: Path::Warm,
            created_at: created_at.to_rfc3339(),
        });
    }

    // Cold path: persist the record before any background work (invariant 1).
    let deployment = Deployment {
        deployment_id: deployment_id.clone(),
        status: DeploymentStatus::Validating,
        hf_model_id: hf_model_id.clone(),
        user_webhook_url: req.user_webhook_url.clone(),
        gpu_tier: req.gpu_tier.clone(),
        region: req.region.clone(),
        runpod_endpoint_id: None,
        endpoint_url: None,
        gpu_allocated: None,
        model_vram_gb: None,
        logs: Vec::new(),
        error: None,
        created_at,
        ready_at: None,
        user_hash: user_hash.clone(),
        provider: provider_name,
        endpoint_name,
        pool_policy: "on-demand".to_string(),
    };
    state.store.set(deployment).await;

    state.secrets.insert(
        &deployment_id,
        DeploymentSecrets {
            provider_api_key: api_key,
            hf_token: req.hf_token.clone(),
            s3_access_key_id: req.user_aws_access_key_id.clone(),
            s3_secret_access_key: req.user_aws_secret_access_key.clone(),
            s3_model_url: req.user_s3_url.clone(),
            s3_endpoint_url: req.user_aws_endpoint_url.clone(),
        },
    );

    state.metrics.deployments_created_total.inc();

    // Dispatch the background workflow. A real deployment drives this via
    // the durable task-queue trampoline (spec §9); the in-process spawn
    // below is the single-replica fallback path described there.
    let bg_state = state.clone();
    let bg_id = deployment_id.clone();
    let task_req = req.clone();
    tokio::spawn(async move {
        run_workflow(bg_state, bg_id, task_req).await;
    });

    Ok(CreateDeploymentResponse {
        deployment_id: deployment_id.clone(),
        status: "accepted_cold".to_string(),
        model_id: hf_model_id,
        estimated_ready_seconds: 180,
        estimated_ready_at: (created_at + chrono::Duration::seconds(180)).to_rfc3339(),
        poll_interval_seconds: 5,
        stream_url: format!("/v1/deployments/{deployment_id}/stream"),
        webhook_url: req.user_webhook_url,
        endpoint_url: None,
        path: Path::Cold,
        created_at: created_at.to_rfc3339(),
    })
}

/// The background provisioning workflow (spec §4.5 transitions table).
pub async fn run_workflow(state: AppState, deployment_id: String, req: CreateDeploymentRequest) {
    if let Err(e) = run_workflow_inner(&state, &deployment_id, &req).await {
        error!(deployment_id = %deployment_id, error = %e, "orchestration workflow failed");
        let _ = state
            .store
            .update(
                &deployment_id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Failed),
                    error: Some(e.to_string()),
                    ..Default::default()
                },
            )
            .await;
        let _ = state
            .store
            .append_log(&deployment_id, LogLevel::Error, e.to_string())
            .await;
        state.metrics.deployments_failed_total.inc();
    }
    state.secrets.remove(&deployment_id);
}

async fn is_deleted(state: &AppState, deployment_id: &str) -> bool {
    matches!(
        state.store.get(deployment_id).await.map(|d| d.status),
        Some(DeploymentStatus::Deleted)
    )
}

async fn run_workflow_inner(
    state: &AppState,
    deployment_id: &str,
    req: &CreateDeploymentRequest,
) -> Result<(), OrchestratorError> {
    let Some(deployment) = state.store.get(deployment_id).await else {
        return Err(OrchestratorError::DeploymentNotFound);
    };
    if is_deleted(state, deployment_id).await {
        return Ok(());
    }

    let secrets = state
        .secrets
        .get(deployment_id)
        .ok_or_else(|| OrchestratorError::Internal("deployment secrets expired".to_string()))?;

    // --- validating -> selecting_gpu -------------------------------------
    resolver::check_task_support(&deployment.hf_model_id, req.task)?;

    if !resolver::vram::curated_registry().contains_key(deployment.hf_model_id.as_str()) {
        resolver::hf::check_model_exists(
            &state.http_client,
            &deployment.hf_model_id,
            secrets.hf_token.as_deref(),
            state.config.hf_timeout_secs,
        )
        .await?;
    }

    let vram_gb = resolver::estimate_vram_gb(&deployment.hf_model_id);
    state
        .store
        .update(
            deployment_id,
            DeploymentPatch {
                status: Some(DeploymentStatus::SelectingGpu),
                model_vram_gb: Some(vram_gb),
                ..Default::default()
            },
        )
        .await;
    state
        .store
        .append_log(
            deployment_id,
            LogLevel::Info,
            format!("model validated, estimated VRAM requirement {vram_gb}GB"),
        )
        .await?;

    if is_deleted(state, deployment_id).await {
        return Ok(());
    }

    // --- selecting_gpu -> creating_endpoint -------------------------------
    let candidates = crate::gpu::select_candidates(vram_gb, deployment.gpu_tier.as_deref())?;
    state
        .store
        .update(
            deployment_id,
            DeploymentPatch {
                status: Some(DeploymentStatus::CreatingEndpoint),
                ..Default::default()
            },
        )
        .await;

    if is_deleted(state, deployment_id).await {
        return Ok(());
    }

    let provider = state
        .provider(&deployment.provider)
        .ok_or_else(|| OrchestratorError::Internal(format!("unknown provider '{}'", deployment.provider)))?;

    let env = build_worker_env(state, &deployment, &secrets);

    let mut last_error: Option<OrchestratorError> = None;
    let mut created = None;
    let mut allocated: Option<crate::gpu::GpuType> = None;

    for candidate in &candidates {
        let opts = CreateEndpointOptions {
            template_id: if state.config.runpod_template_id.is_empty() {
                None
            } else {
                Some(state.config.runpod_template_id.clone())
            },
            workers_min: Some(0),
            workers_max: Some(1),
            idle_timeout_secs: Some(5),
            locations: deployment.region.clone().map(|r| vec![r]),
            ..Default::default()
        };

        match provider
            .create_endpoint(
                &deployment.endpoint_name,
                candidate.id,
                WORKER_IMAGE,
                &env,
                &secrets.provider_api_key,
                &opts,
            )
            .await
        {
            Ok(endpoint) => {
                created = Some(endpoint);
                allocated = Some(*candidate);
                break;
            }
            Err(OrchestratorError::ProviderApi { message, is_capacity: true }) => {
                state.metrics.provider_capacity_errors_total.inc();
                state
                    .store
                    .append_log(
                        deployment_id,
                        LogLevel::Warn,
                        format!("candidate '{}' unavailable: {message}", candidate.id),
                    )
                    .await?;
                last_error = Some(OrchestratorError::ProviderApi { message, is_capacity: true });
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    let Some(created) = created else {
        return Err(last_error.unwrap_or(OrchestratorError::Internal(
            "no GPU candidate available".to_string(),
        )));
    };
    let allocated = allocated.expect("set alongside `created`");

    state
        .store
        .update(
            deployment_id,
            DeploymentPatch {
                status: Some(DeploymentStatus::LoadingModel),
                runpod_endpoint_id: Some(created.id.clone()),
                endpoint_url: Some(created.url.clone()),
                gpu_allocated: Some(allocated.display_name.to_string()),
                ..Default::default()
            },
        )
        .await;
    state
        .store
        .append_log(
            deployment_id,
            LogLevel::Info,
            format!("endpoint created on {}", allocated.display_name),
        )
        .await?;

    if is_deleted(state, deployment_id).await {
        return Ok(());
    }

    // --- loading_model -> ready: race worker callback against the probe --
    let probe_state = state.clone();
    let probe_id = deployment_id.to_string();
    let probe_url = created.url.clone();
    let probe_handle = tokio::spawn(async move {
        readiness_monitor(probe_state, probe_id, probe_url).await;
    });

    // The monitor surrenders to the worker callback after its timeout
    // (spec: "monitor timeout (15 min): stays; warn; surrender to worker
    // callback") — we simply await it; it never errors.
    let _ = probe_handle.await;

    Ok(())
}

/// Environment injected into the worker container (spec §4.5 "Worker
/// environment passed on create").
fn build_worker_env(
    state: &AppState,
    deployment: &Deployment,
    secrets: &DeploymentSecrets,
) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("HF_MODEL_ID".to_string(), deployment.hf_model_id.clone());
    if let Some(token) = &secrets.hf_token {
        env.insert("HF_TOKEN".to_string(), token.clone());
    }
    env.insert("DEPLOYMENT_ID".to_string(), deployment.deployment_id.clone());
    env.insert(
        "VISGATE_WEBHOOK".to_string(),
        state.config.worker_webhook_url(&deployment.deployment_id),
    );
    env.insert(
        "VISGATE_INTERNAL_SECRET".to_string(),
        state.config.internal_secret.clone(),
    );
    if let Some(key) = &secrets.s3_access_key_id {
        env.insert("AWS_ACCESS_KEY_ID".to_string(), key.clone());
    }
    if let Some(key) = &secrets.s3_secret_access_key {
        env.insert("AWS_SECRET_ACCESS_KEY".to_string(), key.clone());
    }
    if let Some(url) = &secrets.s3_endpoint_url {
        env.insert("AWS_ENDPOINT_URL".to_string(), url.clone());
    }
    if let Some(url) = &secrets.s3_model_url {
        env.insert("S3_MODEL_URL".to_string(), url.clone());
    }
    env.insert(
        "VISGATE_LOG_TUNNEL_URL".to_string(),
        format!(
            "{}/internal/logs/{}?secret={}",
            state.config.base_url.trim_end_matches('/'),
            deployment.deployment_id,
            state.config.internal_secret
        ),
    );
    env
}

/// Bounded poll loop used when the worker-initiated callback may be lost
/// or delayed (spec §4.5 "Readiness probe fallback").
async fn readiness_monitor(state: AppState, deployment_id: String, run_url: String) {
    let deadline =
        tokio::time::Instant::now() + std::time::Duration::from_secs(state.config.readiness_timeout_secs);
    let interval = std::time::Duration::from_secs(state.config.readiness_probe_interval_secs);

    loop {
        if tokio::time::Instant::now() >= deadline {
            warn!(deployment_id = %deployment_id, "readiness monitor timed out, surrendering to worker callback");
            return;
        }

        match state.store.get(&deployment_id).await {
            Some(d) if d.status.is_terminal() => return,
            None => return,
            _ => {}
        }

        match readiness::probe_once(&state.http_client, &run_url, state.config.provider_timeout_secs).await {
            readiness::ProbeOutcome::Ready => {
                mark_ready_and_notify(&state, &deployment_id, Some(run_url.clone())).await;
                return;
            }
            readiness::ProbeOutcome::Failed => {
                // Informational only (spec §9); do not fail the deployment
                // purely on a probe signal — the worker callback remains
                // authoritative. Log and keep polling until timeout.
                let _ = state
                    .store
                    .append_log(
                        &deployment_id,
                        LogLevel::Warn,
                        "readiness probe reported FAILED".to_string(),
                    )
                    .await;
            }
            readiness::ProbeOutcome::StillWarming => {}
        }

        tokio::time::sleep(interval).await;
    }
}

/// Process a worker-reported status transition
/// (`POST /internal/deployment-ready/{id}`, spec §4.5).
pub async fn handle_worker_callback(
    state: &AppState,
    deployment_id: &str,
    callback: WorkerCallback,
) -> Result<(), OrchestratorError> {
    let Some(deployment) = state.store.get(deployment_id).await else {
        return Err(OrchestratorError::DeploymentNotFound);
    };

    // Invariant 2: once ready, only an explicit `failed` is honored; all
    // other updates are idempotently ignored. Terminal-but-not-ready
    // states accept no further work at all.
    if deployment.status == DeploymentStatus::Ready && callback.status != "failed" {
        return Ok(());
    }
    if deployment.status.is_terminal() && deployment.status != DeploymentStatus::Ready {
        return Ok(());
    }

    match callback.status.as_str() {
        "ready" => {
            mark_ready_and_notify(state, deployment_id, callback.endpoint_url).await;
        }
        "downloading_model" => {
            state
                .store
                .update(
                    deployment_id,
                    DeploymentPatch {
                        status: Some(DeploymentStatus::DownloadingModel),
                        ..Default::default()
                    },
                )
                .await;
            state
                .store
                .append_log(
                    deployment_id,
                    LogLevel::Info,
                    callback.message.unwrap_or_else(|| "downloading model".to_string()),
                )
                .await?;
        }
        "loading_model" => {
            state
                .store
                .update(
                    deployment_id,
                    DeploymentPatch {
                        status: Some(DeploymentStatus::LoadingModel),
                        ..Default::default()
                    },
                )
                .await;
            state
                .store
                .append_log(
                    deployment_id,
                    LogLevel::Info,
                    callback.message.unwrap_or_else(|| "loading model".to_string()),
                )
                .await?;
        }
        "failed" => {
            let message = callback.message.unwrap_or_else(|| "worker reported failure".to_string());
            state
                .store
                .update(
                    deployment_id,
                    DeploymentPatch {
                        status: Some(DeploymentStatus::Failed),
                        error: Some(message.clone()),
                        ..Default::default()
                    },
                )
                .await;
            state.store.append_log(deployment_id, LogLevel::Error, message).await?;
            state.metrics.deployments_failed_total.inc();
        }
        other => {
            return Err(OrchestratorError::InvalidRequest(format!(
                "unknown worker status '{other}'"
            )));
        }
    }

    Ok(())
}

/// Worker-initiated teardown (`POST /internal/cleanup/{id}`, SPEC_FULL §4.5
/// "Idle/failure-triggered teardown").
pub async fn handle_cleanup(
    state: &AppState,
    deployment_id: &str,
    reason: Option<String>,
) -> Result<(), OrchestratorError> {
    let Some(deployment) = state.store.get(deployment_id).await else {
        return Err(OrchestratorError::DeploymentNotFound);
    };
    if deployment.status.is_terminal() {
        return Ok(());
    }

    if let Some(provider) = state.provider(&deployment.provider) {
        if let Some(endpoint_id) = &deployment.runpod_endpoint_id {
            if let Some(secrets) = state.secrets.get(deployment_id) {
                let _ = provider.delete_endpoint(endpoint_id, &secrets.provider_api_key).await;
            }
        }
    }

    let next_status = if deployment.status == DeploymentStatus::Ready {
        DeploymentStatus::Deleted
    } else {
        DeploymentStatus::Failed
    };
    let message = reason.unwrap_or_else(|| "worker-initiated cleanup".to_string());

    state
        .store
        .update(
            deployment_id,
            DeploymentPatch {
                status: Some(next_status),
                error: Some(message.clone()),
                ..Default::default()
            },
        )
        .await;
    state.store.append_log(deployment_id, LogLevel::Warn, message).await?;

    Ok(())
}

/// `DELETE /v1/deployments/{id}` (spec §4.5 transitions table, last row).
pub async fn delete_deployment(state: &AppState, deployment_id: &str) -> Result<(), OrchestratorError> {
    let Some(deployment) = state.store.get(deployment_id).await else {
        return Err(OrchestratorError::DeploymentNotFound);
    };

    if deployment.status != DeploymentStatus::Deleted {
        if let Some(provider) = state.provider(&deployment.provider) {
            if let Some(endpoint_id) = &deployment.runpod_endpoint_id {
                if let Some(secrets) = state.secrets.get(deployment_id) {
                    let _ = provider.delete_endpoint(endpoint_id, &secrets.provider_api_key).await;
                }
            }
        }
        state
            .store
            .update(
                deployment_id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Deleted),
                    ..Default::default()
                },
            )
            .await;
    }
    Ok(())
}

/// Idempotently transition a deployment to `ready` and deliver the user
/// webhook (spec §4.5 "mark_ready_and_notify").
///
/// Returns `true` on success (including the idempotent "already ready"
/// case), `false` if the record is missing or webhook delivery exhausted
/// its retries (non-fatal to deployment state).
pub async fn mark_ready_and_notify(
    state: &AppState,
    deployment_id: &str,
    endpoint_url: Option<String>,
) -> bool {
    let Some(existing) = state.store.get(deployment_id).await else {
        return false;
    };

    // Idempotent early-return — the serialization point for concurrent
    // callers (worker callback racing the probe fallback, spec §5).
    if existing.status == DeploymentStatus::Ready && existing.ready_at.is_some() {
        return true;
    }

    let resolved_url = endpoint_url
        .or_else(|| existing.endpoint_url.clone())
        .map(|u| Deployment::normalize_endpoint_url(&u));

    let now = Utc::now();
    let updated = state
        .store
        .update(
            deployment_id,
            DeploymentPatch {
                status: Some(DeploymentStatus::Ready),
                ready_at: Some(now),
                endpoint_url: resolved_url,
                ..Default::default()
            },
        )
        .await;

    let Some(deployment) = updated else {
        return false;
    };

    let _ = state
        .store
        .append_log(deployment_id, LogLevel::Info, "ready".to_string())
        .await;

    let duration_seconds = (deployment.ready_at.unwrap_or(now) - deployment.created_at).num_seconds();
    state.metrics.deployments_ready_total.inc();
    state
        .metrics
        .time_to_ready_seconds
        .observe(duration_seconds.max(0) as f64);

    let payload = webhook::build_payload(&deployment, duration_seconds);
    let delivery = webhook::deliver(
        &state.http_client,
        &deployment.user_webhook_url,
        &payload,
        state.config.webhook_timeout_secs,
    )
    .await;

    match delivery {
        Ok(()) => true,
        Err(err) => {
            warn!(deployment_id = %deployment_id, error = %err, "user webhook delivery failed after retries");
            let _ = state
                .store
                .append_log(
                    deployment_id,
                    LogLevel::Warn,
                    "User webhook delivery failed after retries".to_string(),
                )
                .await;
            state.metrics.webhook_delivery_failures_total.inc();
            false
        }
    }
}
