//! The deployment record — the one durable entity this service owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a deployment.
///
/// `Ready`, `Failed`, `WebhookFailed` and `Deleted` are terminal: once a
/// deployment reaches one of them, only a `delete` request is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Validating,
    SelectingGpu,
    CreatingEndpoint,
    DownloadingModel,
    LoadingModel,
    Ready,
    Failed,
    WebhookFailed,
    Deleted,
}

impl DeploymentStatus {
    /// Terminal states accept no further orchestration work except delete.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentStatus::Ready
                | DeploymentStatus::Failed
                | DeploymentStatus::WebhookFailed
                | DeploymentStatus::Deleted
        )
    }

    /// Remaining-seconds estimate used in the create response (spec §6).
    pub fn estimated_remaining_seconds(self) -> u64 {
        match self {
            DeploymentStatus::Validating => 20,
            DeploymentStatus::SelectingGpu => 15,
            DeploymentStatus::CreatingEndpoint => 120,
            DeploymentStatus::DownloadingModel => 90,
            DeploymentStatus::LoadingModel => 45,
            _ if self.is_terminal() => 0,
            _ => 60,
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Validating => "validating",
            DeploymentStatus::SelectingGpu => "selecting_gpu",
            DeploymentStatus::CreatingEndpoint => "creating_endpoint",
            DeploymentStatus::DownloadingModel => "downloading_model",
            DeploymentStatus::LoadingModel => "loading_model",
            DeploymentStatus::Ready => "ready",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::WebhookFailed => "webhook_failed",
            DeploymentStatus::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "validating" => DeploymentStatus::Validating,
            "selecting_gpu" => DeploymentStatus::SelectingGpu,
            "creating_endpoint" => DeploymentStatus::CreatingEndpoint,
            "downloading_model" => DeploymentStatus::DownloadingModel,
            "loading_model" => DeploymentStatus::LoadingModel,
            "ready" => DeploymentStatus::Ready,
            "failed" => DeploymentStatus::Failed,
            "webhook_failed" => DeploymentStatus::WebhookFailed,
            "deleted" => DeploymentStatus::Deleted,
            other => return Err(format!("unknown deployment status '{other}'")),
        })
    }
}

/// Severity of an appended log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// One line in a deployment's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// The durable deployment record (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub deployment_id: String,
    pub status: DeploymentStatus,
    pub hf_model_id: String,
    pub user_webhook_url: String,
    pub gpu_tier: Option<String>,
    pub region: Option<String>,
    pub runpod_endpoint_id: Option<String>,
    pub endpoint_url: Option<String>,
    pub gpu_allocated: Option<String>,
    pub model_vram_gb: Option<u32>,
    pub logs: Vec<LogLine>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub user_hash: String,
    pub provider: String,
    pub endpoint_name: String,
    pub pool_policy: String,
}

impl Deployment {
    /// Normalize a raw invocation URL to the `/run`-suffixed form required
    /// by invariant 4 (spec §3).
    pub fn normalize_endpoint_url(raw: &str) -> String {
        let trimmed = raw.trim_end_matches('/');
        if trimmed.ends_with("/run") {
            trimmed.to_string()
        } else if trimmed.ends_with("/runsync") {
            format!("{}/run", &trimmed[..trimmed.len() - "/runsync".len()])
        } else {
            format!("{trimmed}/run")
        }
    }
}

/// Generate a deployment id shaped `dep_<YYYY>_<8hex>`.
pub fn generate_deployment_id() -> String {
    let year = Utc::now().format("%Y");
    let hex: String = {
        let bytes: [u8; 4] = rand::random();
        hex::encode(bytes)
    };
    format!("dep_{year}_{hex}")
}
