//! Request/response DTOs for the public HTTP API (spec §6).

use serde::{Deserialize, Serialize};

/// Inference task kind, used by the capability oracle's task-support check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Text2img,
    Image2img,
    Text2video,
}

/// Cache scope for worker model caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    #[default]
    Off,
    Shared,
    Private,
}

/// `POST /v1/deployments` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeploymentRequest {
    pub hf_model_id: Option<String>,
    pub model_name: Option<String>,
    pub provider: Option<String>,
    pub user_webhook_url: String,
    pub user_runpod_key: Option<String>,
    pub hf_token: Option<String>,
    pub gpu_tier: Option<String>,
    pub region: Option<String>,
    pub task: Option<Task>,
    #[serde(default)]
    pub cache_scope: CacheScope,
    pub user_s3_url: Option<String>,
    pub user_aws_access_key_id: Option<String>,
    pub user_aws_secret_access_key: Option<String>,
    pub user_aws_endpoint_url: Option<String>,
}

/// Discriminates the short-circuit path taken for a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Path {
    Warm,
    Cold,
}

/// `POST /v1/deployments` response body (202 Accepted).
#[derive(Debug, Clone, Serialize)]
pub struct CreateDeploymentResponse {
    pub deployment_id: String,
    pub status: String,
    pub model_id: String,
    pub estimated_ready_seconds: u64,
    pub estimated_ready_at: String,
    pub poll_interval_seconds: u64,
    pub stream_url: String,
    pub webhook_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    pub path: Path,
    pub created_at: String,
}

/// Full record projection returned by `GET /v1/deployments/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentView {
    pub deployment_id: String,
    pub status: String,
    pub hf_model_id: String,
    pub gpu_tier: Option<String>,
    pub region: Option<String>,
    pub runpod_endpoint_id: Option<String>,
    pub endpoint_url: Option<String>,
    pub gpu_allocated: Option<String>,
    pub model_vram_gb: Option<u32>,
    pub error: Option<String>,
    pub created_at: String,
    pub ready_at: Option<String>,
}

/// Worker lifecycle callback body (`POST /internal/deployment-ready/{id}`).
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerCallback {
    pub status: String,
    pub message: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Worker-initiated teardown body (`POST /internal/cleanup/{id}`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CleanupRequest {
    pub reason: Option<String>,
    #[serde(default)]
    pub idle: bool,
}
