//! Orchestrator error taxonomy (spec §7).

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

/// Top-level error type returned by every fallible operation in the
/// orchestrator. Each variant maps to exactly one HTTP status and error
/// code per spec §6.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid deployment request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("model '{0}' not found on Hugging Face Hub")]
    HfModelNotFound(String),

    #[error("unknown model alias: {model_name}/{provider}")]
    UnknownModel {
        model_name: String,
        provider: String,
    },

    #[error("insufficient GPU capacity for {required_vram_gb}GB")]
    InsufficientGpu { required_vram_gb: u32 },

    #[error("provider API error: {message}")]
    ProviderApi { message: String, is_capacity: bool },

    #[error("webhook delivery failed: {0}")]
    WebhookDelivery(String),

    #[error("deployment not found")]
    DeploymentNotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    fn code(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidRequest(_) => "InvalidDeploymentRequest",
            OrchestratorError::Unauthorized => "Unauthorized",
            OrchestratorError::RateLimited { .. } => "RateLimit",
            OrchestratorError::HfModelNotFound(_) => "HFModelNotFound",
            OrchestratorError::UnknownModel { .. } => "InvalidDeploymentRequest",
            OrchestratorError::InsufficientGpu { .. } => "InsufficientGPU",
            OrchestratorError::ProviderApi { .. } => "ProviderAPIError",
            OrchestratorError::WebhookDelivery(_) => "WebhookDeliveryError",
            OrchestratorError::DeploymentNotFound => "DeploymentNotFound",
            OrchestratorError::Internal(_) => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OrchestratorError::InvalidRequest(_) | OrchestratorError::UnknownModel { .. } => {
                StatusCode::BAD_REQUEST
            }
            OrchestratorError::Unauthorized => StatusCode::UNAUTHORIZED,
            OrchestratorError::HfModelNotFound(_) | OrchestratorError::DeploymentNotFound => {
                StatusCode::NOT_FOUND
            }
            OrchestratorError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            OrchestratorError::ProviderApi { .. } | OrchestratorError::WebhookDelivery(_) => {
                StatusCode::BAD_GATEWAY
            }
            OrchestratorError::InsufficientGpu { .. } => StatusCode::SERVICE_UNAVAILABLE,
            OrchestratorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> serde_json::Value {
        match self {
            OrchestratorError::UnknownModel {
                model_name,
                provider,
            } => json!({ "model_name": model_name, "provider": provider }),
            OrchestratorError::InsufficientGpu { required_vram_gb } => {
                json!({ "required_vram_gb": required_vram_gb })
            }
            OrchestratorError::RateLimited {
                retry_after_seconds,
            } => json!({ "retry_after_seconds": retry_after_seconds }),
            _ => json!({}),
        }
    }
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
            "details": self.details(),
        }));
        (status, body).into_response()
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
